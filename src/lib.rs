pub mod baseline;
pub mod bench;
pub mod candidates;
pub mod checksum;
pub mod config;
pub mod domain;
pub mod download;
pub mod error;
pub mod output;
pub mod probe;
pub mod report;
pub mod sampler;
pub mod select;
pub mod stats;
pub mod submit;
pub mod transport;
pub mod trials;
