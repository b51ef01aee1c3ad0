//! Application router configuration mapping each tool to a POST endpoint.
//!
//! The transport is deliberately thin: it deserializes the named arguments,
//! calls the tool, and returns the [ToolResponse](crate::tools::ToolResponse)
//! as JSON. Tool failures are reported in-band through the `status` field
//! with HTTP 200, so callers only ever handle one result shape. Malformed
//! request bodies are rejected by the JSON extractor before any tool runs.

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
};

use crate::{
    AppState, tools,
    tools::{AddExpenseArgs, DeleteExpenseArgs, GetExpenseSummaryArgs, GetExpensesArgs},
};

/// The route for the `add_expense` tool.
pub const ADD_EXPENSE: &str = "/tools/add_expense";
/// The route for the `get_expenses` tool.
pub const GET_EXPENSES: &str = "/tools/get_expenses";
/// The route for the `get_expense_summary` tool.
pub const GET_EXPENSE_SUMMARY: &str = "/tools/get_expense_summary";
/// The route for the `delete_expense` tool.
pub const DELETE_EXPENSE: &str = "/tools/delete_expense";

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(ADD_EXPENSE, post(add_expense_endpoint))
        .route(GET_EXPENSES, post(get_expenses_endpoint))
        .route(GET_EXPENSE_SUMMARY, post(get_expense_summary_endpoint))
        .route(DELETE_EXPENSE, post(delete_expense_endpoint))
        .with_state(state)
}

async fn add_expense_endpoint(
    State(state): State<AppState>,
    Json(args): Json<AddExpenseArgs>,
) -> Response {
    Json(tools::add_expense(&state.store, args)).into_response()
}

async fn get_expenses_endpoint(
    State(state): State<AppState>,
    Json(args): Json<GetExpensesArgs>,
) -> Response {
    Json(tools::get_expenses(&state.store, args)).into_response()
}

async fn get_expense_summary_endpoint(
    State(state): State<AppState>,
    Json(args): Json<GetExpenseSummaryArgs>,
) -> Response {
    Json(tools::get_expense_summary(&state.store, args)).into_response()
}

async fn delete_expense_endpoint(
    State(state): State<AppState>,
    Json(args): Json<DeleteExpenseArgs>,
) -> Response {
    Json(tools::delete_expense(&state.store, args)).into_response()
}
