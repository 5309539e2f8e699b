use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const ENUM_TYPES: &[(&str, &[&str])] = &[
    (
        "loyalty_tier_level",
        &["bronze", "silver", "gold", "platinum", "diamond"],
    ),
    (
        "order_status",
        &[
            "pending",
            "processing",
            "completed",
            "fulfilled",
            "delivered",
            "cancelled",
        ],
    ),
    (
        "financial_status",
        &[
            "pending",
            "authorized",
            "paid",
            "partially_paid",
            "refunded",
            "partially_refunded",
            "voided",
        ],
    ),
    ("reward_type", &["tier_promotion", "points_redemption"]),
    ("reward_status", &["active", "used", "expired"]),
    ("action_plan_status", &["active", "dormant"]),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, values) in ENUM_TYPES {
            manager
                .create_type(
                    Type::create()
                        .as_enum(Alias::new(*name))
                        .values(values.iter().map(|v| Alias::new(*v)))
                        .to_owned(),
                )
                .await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, _) in ENUM_TYPES.iter().rev() {
            manager
                .drop_type(Type::drop().if_exists().name(Alias::new(*name)).to_owned())
                .await?;
        }
        Ok(())
    }
}
