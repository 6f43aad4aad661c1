pub mod env;
pub mod taxi_v3;
pub mod vec_env;
pub mod wrappers;
