pub mod customer;
pub mod reservation;
pub mod reservation_history;
pub mod restaurant;
pub mod restaurant_table;
pub mod service;
