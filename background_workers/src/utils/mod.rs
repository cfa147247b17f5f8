pub mod callbacks;
pub mod rate_limiting;
