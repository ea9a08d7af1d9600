//! Generated message and service types for `signal_engine.proto`.

tonic::include_proto!("signalengine");
