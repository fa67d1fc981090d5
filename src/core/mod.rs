pub mod builder;
pub mod file_reads;
pub mod multipart;
pub mod node_index;
pub mod preview;
pub mod serializer;
pub mod services;
pub mod session;
pub mod validation;
