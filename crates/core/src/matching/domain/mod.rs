pub mod similarity_matcher;
