//! Indexing engine for Scribe
//!
//! This crate runs the consumer side of the pipeline and wires the
//! lower layers together:
//! - ScribeConfig: `scribe.toml` configuration
//! - Registry / DefaultDocumentBuilder: resolver and builder lookup
//! - OperationProcessor: applies one record to an index connection
//! - QueueWorker: the single background consumer with batched flushes
//! - ConnectionHub / IndexSearch: per-thread search connections
//! - OperationFactory: producer entry point, buffered or synchronous
//! - Pipeline: administrative facade (start/stop worker, invalidate)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod config;
pub mod factory;
pub mod hub;
pub mod pipeline;
pub mod processor;
pub mod registry;
pub mod worker;

pub use builder::DefaultDocumentBuilder;
pub use config::{DispatchMode, ScribeConfig, CONFIG_FILE_NAME};
pub use factory::{BufferedSink, LifecycleEvent, OperationFactory, OperationSink, SynchronousSink};
pub use hub::{ConnectionHub, IndexSearch, Invalidate};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use processor::OperationProcessor;
pub use registry::Registry;
pub use worker::{FlushHook, QueueWorker, WorkerSettings, WorkerStats};
