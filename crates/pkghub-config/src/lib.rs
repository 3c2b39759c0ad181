pub mod config;
pub mod error;
pub mod utils;

#[cfg(test)]
pub mod test_utils;
