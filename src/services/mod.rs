pub mod dedup_guard;
pub mod month_cursor;
pub mod occupancy;
pub mod owner_payouts;
pub mod rent_invoices;
pub mod scheduler;
pub mod tenant_lifecycle;
