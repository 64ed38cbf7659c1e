//! Operation surface for transports.

pub mod api;

pub use api::{
    ApiError, ApiResponse, ApiResult, CreateEventRequest, EnrollRequest, Health, LedgerService,
    UpdateEventRequest, WithdrawRequest,
};
