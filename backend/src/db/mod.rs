//! DynamoDB access for the disease reference collection, the product
//! catalog, and per-user scan history.

pub mod dynamodb_repository;
pub mod seed;
