use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "metrics")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub device_id: i32,
    pub name: String,
    pub unit: String,
    pub value: f64,
    pub timestamp: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::devices::Entity",
        from = "Column::DeviceId",
        to = "super::devices::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Device,
    #[sea_orm(has_many = "super::subscription_metrics::Entity")]
    SubscriptionMetrics,
}

impl Related<super::devices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Device.def()
    }
}

impl Related<super::subscription_metrics::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubscriptionMetrics.def()
    }
}

impl Related<super::subscriptions::Entity> for Entity {
    fn to() -> RelationDef {
        super::subscription_metrics::Relation::Subscription.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::subscription_metrics::Relation::Metric.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
