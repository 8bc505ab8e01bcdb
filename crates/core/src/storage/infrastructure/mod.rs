pub mod append_log_corpus_repository;
pub mod json_corpus_repository;
pub mod json_file;
pub mod json_ledger_repository;
