pub mod payment_reader;
pub mod record_writer;
