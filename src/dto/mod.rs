pub mod catalog;
pub mod fixture;
pub mod health;
pub mod pool;
pub mod prediction;
pub mod session;
pub mod sse;
pub mod standings;
pub mod validation;
