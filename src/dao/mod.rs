pub mod assignments;
pub mod bookings;
pub mod common;
pub mod compliance;
pub mod contracts;
pub mod correspondence;
pub mod dashboard;
pub mod documents;
pub mod employees;
pub mod employments;
pub mod expenses;
pub mod fuelcards;
pub mod insurances;
pub mod maintenance;
pub mod mileage;
pub mod payslips;
pub mod projects;
pub mod refuels;
pub mod roles;
pub mod suppliers;
pub mod tasks;
pub mod vehicles;
