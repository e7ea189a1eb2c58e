use crate::entities::{OrderStatus, order_entity};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const SEAT_DELIMITER: char = ',';

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    #[schema(example = "Dune: Part Two")]
    pub movie_title: Option<String>,
    #[schema(example = "19:30")]
    pub showtime: Option<String>,
    #[schema(example = "2026-10-16")]
    pub show_date: Option<String>,
    #[serde(default)]
    #[schema(example = json!(["A1", "A2"]))]
    pub seats: Vec<String>,
    /// Defaults to the number of seats.
    pub ticket_count: Option<i32>,
    #[serde(default)]
    pub total_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: i64,
    pub movie_title: String,
    pub showtime: String,
    pub show_date: NaiveDate,
    pub seats: Vec<String>,
    pub ticket_count: i32,
    pub total_price: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderResponse {
    pub success: bool,
    pub order: OrderResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderListResponse {
    pub success: bool,
    pub orders: Vec<OrderResponse>,
}

pub fn join_seats(seats: &[String]) -> String {
    seats.join(&SEAT_DELIMITER.to_string())
}

pub fn split_seats(stored: &str) -> Vec<String> {
    if stored.is_empty() {
        return Vec::new();
    }
    stored.split(SEAT_DELIMITER).map(str::to_string).collect()
}

impl From<order_entity::Model> for OrderResponse {
    fn from(m: order_entity::Model) -> Self {
        Self {
            id: m.id,
            seats: split_seats(&m.seats),
            movie_title: m.movie_title,
            showtime: m.showtime,
            show_date: m.show_date,
            ticket_count: m.ticket_count,
            total_price: m.total_price,
            status: m.status,
            created_at: m.created_at,
        }
    }
}
