pub mod constants;
pub mod prompts;
pub mod test_helpers;
pub mod types;
