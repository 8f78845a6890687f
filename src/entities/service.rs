use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::time::parse_time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    #[sea_orm(string_value = "laborable")]
    Laborable,
    #[sea_orm(string_value = "fin_de_semana")]
    FinDeSemana,
    #[sea_orm(string_value = "todos")]
    Todos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum Season {
    #[sea_orm(string_value = "todo_el_ano")]
    TodoElAno,
    #[sea_orm(string_value = "verano")]
    Verano,
    #[sea_orm(string_value = "invierno")]
    Invierno,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "lowercase")]
pub enum SlotMode {
    #[sea_orm(string_value = "auto")]
    Auto,
    #[sea_orm(string_value = "manual")]
    Manual,
}

/// A meal service (lunch, dinner, ...) with the window in which it takes bookings.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub day_type: DayType,
    pub season: Season,
    pub start_time: Time,
    pub end_time: Time,
    pub slot_mode: SlotMode,
    pub slot_interval_minutes: i32,
    pub time_slots: Option<Json>,
    pub table_ids: Option<Json>,
    pub active: bool,
}

impl Model {
    /// Explicit slots configured for manual mode. Unparseable entries are skipped.
    pub fn manual_slots(&self) -> Vec<Time> {
        self.time_slots
            .as_ref()
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().and_then(parse_time))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn eligible_tables(&self) -> Vec<Uuid> {
        self.table_ids
            .as_ref()
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().and_then(|s| Uuid::parse_str(s).ok()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::restaurant::Entity",
        from = "Column::RestaurantId",
        to = "super::restaurant::Column::Id"
    )]
    Restaurant,
}

impl Related<super::restaurant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Restaurant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
