pub mod app;
pub mod cache;
pub mod canonicalize;
pub mod config;
pub mod conflation;
pub mod domain;
pub mod error;
pub mod graph;
pub mod graph_io;
pub mod nodenorm;
pub mod normalizer;
pub mod output;
