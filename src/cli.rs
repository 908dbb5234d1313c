pub mod cli_adapter;
