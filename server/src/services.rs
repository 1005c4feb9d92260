pub mod queueservice;
