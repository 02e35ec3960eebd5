//! Messages exchanged between nodes, and the generated `Collective` service.
//!
//! The service stubs come from `build.rs`; the message types are written
//! here as prost derives.

/// Asks the coordinator whether the run may proceed. Blocks until it decides.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PreflightRequest {
    #[prost(uint32, tag = "1")]
    pub rank: u32,
}

/// The coordinator's decision after validating the inputs.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PreflightVerdict {
    #[prost(bool, tag = "1")]
    pub proceed: bool,
    /// Element count of each input; meaningful only when `proceed` is set.
    #[prost(uint64, tag = "2")]
    pub total: u64,
    #[prost(string, tag = "3")]
    pub reason: ::prost::alloc::string::String,
}

/// Distinguishes the blocks a participant can send.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum BlockKind {
    Unspecified = 0,
    Histogram = 1,
    Abort = 2,
}

/// One participant's contribution: a full histogram or an abort notice.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HistogramBlock {
    #[prost(uint32, tag = "1")]
    pub rank: u32,
    #[prost(enumeration = "BlockKind", tag = "2")]
    pub kind: i32,
    #[prost(uint64, repeated, tag = "3")]
    pub counts: ::prost::alloc::vec::Vec<u64>,
    #[prost(string, tag = "4")]
    pub reason: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Ack {}

include!(concat!(env!("OUT_DIR"), "/histlite.Collective.rs"));
