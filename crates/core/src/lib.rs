pub mod encoding;
pub mod matching;
pub mod pipeline;
pub mod publishing;
pub mod shared;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;
