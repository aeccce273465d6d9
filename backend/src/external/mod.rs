//! External API integrations

pub mod invoice;

pub use invoice::InvoiceExtractionClient;
