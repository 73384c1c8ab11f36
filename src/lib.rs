//! Generic CRUD layer with soft delete and pagination.
//!
//! A resource plugs in by providing a [`record::DataTransferObject`], an
//! [`record::EntityRecord`] and a [`record::Mapper`] between them.
//! [`service::GenericService`] implements the CRUD rules on top of any
//! [`repository::Repository`], and [`handlers::crud_router`] exposes a
//! service over HTTP.

pub mod api_doc;
pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod record;
pub mod repository;
pub mod resources;
pub mod routes;
pub mod service;
pub mod spanner;
pub mod state;
