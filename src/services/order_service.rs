use crate::entities::order_entity as orders;
use crate::error::{AppError, AppResult};
use crate::models::{CreateOrderRequest, SEAT_DELIMITER, join_seats};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

/// A create-order request that passed shape validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub movie_title: String,
    pub showtime: String,
    pub show_date: NaiveDate,
    pub seats: Vec<String>,
    pub ticket_count: i32,
    pub total_price: i64,
}

fn required(field: Option<String>) -> Option<String> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl TryFrom<CreateOrderRequest> for NewOrder {
    type Error = AppError;

    fn try_from(req: CreateOrderRequest) -> AppResult<Self> {
        let seats: Vec<String> = req.seats.iter().map(|s| s.trim().to_string()).collect();

        let (Some(movie_title), Some(showtime), Some(show_date)) = (
            required(req.movie_title),
            required(req.showtime),
            required(req.show_date),
        ) else {
            return Err(AppError::ValidationError(
                "movie_title, showtime, show_date and seats are required".to_string(),
            ));
        };
        if seats.is_empty() {
            return Err(AppError::ValidationError(
                "movie_title, showtime, show_date and seats are required".to_string(),
            ));
        }

        if seats
            .iter()
            .any(|s| s.is_empty() || s.contains(SEAT_DELIMITER))
        {
            return Err(AppError::ValidationError(format!(
                "Seat labels must be non-empty and must not contain '{SEAT_DELIMITER}'"
            )));
        }

        let show_date = NaiveDate::parse_from_str(&show_date, "%Y-%m-%d").map_err(|_| {
            AppError::ValidationError("show_date must be formatted as YYYY-MM-DD".to_string())
        })?;

        let ticket_count = match req.ticket_count {
            Some(n) => n,
            None => i32::try_from(seats.len())
                .map_err(|_| AppError::ValidationError("Too many seats".to_string()))?,
        };
        if ticket_count < 0 || req.total_price < 0 {
            return Err(AppError::ValidationError(
                "ticket_count and total_price must not be negative".to_string(),
            ));
        }

        Ok(NewOrder {
            movie_title,
            showtime,
            show_date,
            seats,
            ticket_count,
            total_price: req.total_price,
        })
    }
}

#[derive(Clone)]
pub struct OrderService {
    pool: DatabaseConnection,
}

impl OrderService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// Record a purchase for `user_id`. The owner always comes from the
    /// session, never from the request body.
    pub async fn create_order(
        &self,
        user_id: i64,
        request: CreateOrderRequest,
    ) -> AppResult<orders::Model> {
        let order = NewOrder::try_from(request)?;

        // status is left to the column default
        let model = orders::ActiveModel {
            user_id: Set(user_id),
            movie_title: Set(order.movie_title),
            showtime: Set(order.showtime),
            show_date: Set(order.show_date),
            seats: Set(join_seats(&order.seats)),
            ticket_count: Set(order.ticket_count),
            total_price: Set(order.total_price),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!(
            "Order {} created for user {user_id}: {} seat(s)",
            model.id,
            order.seats.len()
        );

        Ok(model)
    }

    /// Every order owned by `user_id`, newest first. Unbounded.
    pub async fn list_orders(&self, user_id: i64) -> AppResult<Vec<orders::Model>> {
        let list = orders::Entity::find()
            .filter(orders::Column::UserId.eq(user_id))
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list)
    }
}
