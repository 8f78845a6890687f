use std::fmt;
use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "reservation_status")]
pub enum ReservationStatus {
    #[sea_orm(string_value = "PENDIENTE")]
    #[serde(rename = "PENDIENTE")]
    Pending,
    #[sea_orm(string_value = "CONFIRMADO")]
    #[serde(rename = "CONFIRMADO")]
    Confirmed,
    #[sea_orm(string_value = "CANCELADO")]
    #[serde(rename = "CANCELADO")]
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDIENTE",
            Self::Confirmed => "CONFIRMADO",
            Self::Cancelled => "CANCELADO",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDIENTE" => Ok(Self::Pending),
            "CONFIRMADO" => Ok(Self::Confirmed),
            "CANCELADO" => Ok(Self::Cancelled),
            other => Err(format!("Estado no válido: {}", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservation")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub restaurant_id: Uuid,
    pub customer_id: Uuid,
    pub table_id: Option<Uuid>,
    pub date: Date,
    pub time: Time,
    pub party_size: i32,
    pub status: ReservationStatus,
    /// While set and in the future, the slot is held for this booking.
    pub session_expires_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub special_requests: Option<String>,
    pub confirmed_at: Option<DateTimeWithTimeZone>,
    pub cancelled_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::restaurant::Entity",
        from = "Column::RestaurantId",
        to = "super::restaurant::Column::Id"
    )]
    Restaurant,
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(
        belongs_to = "super::restaurant_table::Entity",
        from = "Column::TableId",
        to = "super::restaurant_table::Column::Id"
    )]
    Table,
    #[sea_orm(has_many = "super::reservation_history::Entity")]
    History,
}

impl Related<super::restaurant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Restaurant.def()
    }
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::restaurant_table::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Table.def()
    }
}

impl Related<super::reservation_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
