use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Stage {
    #[strum(serialize = "fetch balances")]
    FetchBalances,
    #[strum(serialize = "fetch earn positions")]
    FetchEarnPositions,
    #[strum(serialize = "fetch prices")]
    FetchPrices,
    #[strum(serialize = "read average prices")]
    ReadAveragePrices,
    #[strum(serialize = "write sheet")]
    WriteSheet,
}

#[derive(Error, Debug)]
pub enum RoutineError {
    #[error("Routine failed at stage '{stage}'")]
    StageFailed { stage: Stage },
}

impl RoutineError {
    pub fn stage_failed(stage: Stage) -> Self {
        RoutineError::StageFailed { stage }
    }

    pub fn stage(&self) -> Stage {
        match self {
            RoutineError::StageFailed { stage } => *stage,
        }
    }
}

#[async_trait::async_trait]
pub trait Routine: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self) -> error_stack::Result<(), RoutineError>;
}
