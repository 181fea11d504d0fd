#![allow(dead_code)]

pub mod contract;
pub mod mock_redis;
