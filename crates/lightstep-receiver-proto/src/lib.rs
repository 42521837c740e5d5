// lightstep-receiver-proto - Lightstep collector wire definitions
//
// Two schemas live here:
// - `lightstep.collector` protobuf messages and the CollectorService gRPC
//   service (the "v2" format), generated at build time
// - the Thrift `ReportingService` structs (the "v1" format), hand-written
//   against the thrift crate's binary protocol, read through a
//   length-checked reader for request bodies

pub mod lightstep {
    pub mod collector {
        include!(concat!(env!("OUT_DIR"), "/lightstep.collector.rs"));
    }
}

pub mod bounded;
pub mod collectorthrift;

pub use lightstep::collector as collectorpb;
