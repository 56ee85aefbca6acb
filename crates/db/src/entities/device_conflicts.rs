//! `SeaORM` Entity for device_conflicts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "device_conflicts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub new_device_id: String,
    /// Ids of the devices that were active when the takeover happened.
    #[sea_orm(column_type = "JsonBinary")]
    pub old_device_ids: Json,
    pub role: String,
    pub occurred_at: DateTimeWithTimeZone,
    pub resolved: bool,
    pub resolution_notes: Option<String>,
    pub admin_resolved_by: Option<Uuid>,
    pub admin_resolved_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
