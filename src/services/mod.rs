pub mod capture;
pub mod collector;
pub mod correlator;
pub mod intent;
pub mod orders;
pub mod queue;
pub mod storage;
pub mod vision;
