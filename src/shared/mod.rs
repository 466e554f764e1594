pub mod arn;
pub mod aws_sdk;
pub mod cancel;
pub mod constants;
pub mod display;
pub mod operations;
pub mod restore_workflow;
pub mod services;
pub mod ui;

#[cfg(test)]
pub mod testing;
