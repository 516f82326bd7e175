//! Daemon Unit Tests

mod test_enrichment;
mod test_port_sequence;
mod test_volume_naming;
