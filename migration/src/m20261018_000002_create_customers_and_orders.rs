use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    Id,
    OrganizationId,
    Name,
    Email,
    Phone,
    LoyaltyMember,
    LoyaltyPoints,
    LoyaltyTier,
    LoyaltyUsed,
    TotalSpent,
    OrderCount,
    SpecialPoints,
    LastOrderAt,
    RecencyDays,
    RScore,
    FScore,
    MScore,
    EngagementScore,
    ChurnRisk,
    LifetimeValue,
    MetricsUpdatedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    OrganizationId,
    CustomerId,
    TotalAmount,
    Status,
    FinancialStatus,
    CreatedAt,
}

#[derive(DeriveIden)]
enum LoyaltyTiers {
    Table,
    Id,
    OrganizationId,
    Tier,
    MinPoints,
    PointsPerDollar,
    Benefits,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

fn id_col<T: IntoIden + 'static>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .big_integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn timestamp_col<T: IntoIden + 'static>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .default(Expr::cust("NOW()"))
        .null()
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Organizations::Table)
                    .if_not_exists()
                    .col(&mut id_col(Organizations::Id))
                    .col(ColumnDef::new(Organizations::Name).string().not_null())
                    .col(&mut timestamp_col(Organizations::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(&mut id_col(Customers::Id))
                    .col(ColumnDef::new(Customers::OrganizationId).big_integer().not_null())
                    .col(ColumnDef::new(Customers::Name).string().not_null())
                    .col(ColumnDef::new(Customers::Email).string().null())
                    .col(ColumnDef::new(Customers::Phone).string().null())
                    .col(
                        ColumnDef::new(Customers::LoyaltyMember)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Customers::LoyaltyPoints)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Customers::LoyaltyTier)
                            .custom(Alias::new("loyalty_tier_level"))
                            .not_null()
                            .default(Expr::cust("'bronze'")),
                    )
                    .col(
                        ColumnDef::new(Customers::LoyaltyUsed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Customers::TotalSpent)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Customers::OrderCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Customers::SpecialPoints)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Customers::LastOrderAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Customers::RecencyDays).integer().null())
                    .col(ColumnDef::new(Customers::RScore).small_integer().null())
                    .col(ColumnDef::new(Customers::FScore).small_integer().null())
                    .col(ColumnDef::new(Customers::MScore).small_integer().null())
                    .col(
                        ColumnDef::new(Customers::EngagementScore)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Customers::ChurnRisk)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Customers::LifetimeValue)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Customers::MetricsUpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(&mut timestamp_col(Customers::CreatedAt))
                    .col(&mut timestamp_col(Customers::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_customers_organization")
                    .table(Customers::Table)
                    .col(Customers::OrganizationId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(&mut id_col(Orders::Id))
                    .col(ColumnDef::new(Orders::OrganizationId).big_integer().not_null())
                    .col(ColumnDef::new(Orders::CustomerId).big_integer().not_null())
                    .col(ColumnDef::new(Orders::TotalAmount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Orders::Status)
                            .custom(Alias::new("order_status"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::FinancialStatus)
                            .custom(Alias::new("financial_status"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_customer")
                    .table(Orders::Table)
                    .col(Orders::CustomerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LoyaltyTiers::Table)
                    .if_not_exists()
                    .col(&mut id_col(LoyaltyTiers::Id))
                    .col(
                        ColumnDef::new(LoyaltyTiers::OrganizationId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LoyaltyTiers::Tier)
                            .custom(Alias::new("loyalty_tier_level"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(LoyaltyTiers::MinPoints).big_integer().not_null())
                    .col(
                        ColumnDef::new(LoyaltyTiers::PointsPerDollar)
                            .double()
                            .not_null()
                            .default(1.0),
                    )
                    .col(
                        ColumnDef::new(LoyaltyTiers::Benefits)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(&mut timestamp_col(LoyaltyTiers::CreatedAt))
                    .col(&mut timestamp_col(LoyaltyTiers::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // 每个组织每个等级只允许一行
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_loyalty_tiers_org_tier")
                    .table(LoyaltyTiers::Table)
                    .col(LoyaltyTiers::OrganizationId)
                    .col(LoyaltyTiers::Tier)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            LoyaltyTiers::Table.into_iden(),
            Orders::Table.into_iden(),
            Customers::Table.into_iden(),
            Organizations::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}
