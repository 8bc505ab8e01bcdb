pub mod corpus_repository;
pub mod signature_store;
pub mod store_error;
