use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum RewardRedemptions {
    Table,
    Id,
    OrganizationId,
    CustomerId,
    Code,
    RewardType,
    Tier,
    PointsUsed,
    Description,
    Status,
    ExpiresAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Segments {
    Table,
    Id,
    OrganizationId,
    Name,
    Description,
    SegmentType,
    IsSmart,
    AutoUpdate,
    Conditions,
    CustomerCount,
    LastEvaluatedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SegmentMembers {
    Table,
    Id,
    SegmentId,
    CustomerId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ActionPlans {
    Table,
    Id,
    OrganizationId,
    PlanKey,
    Template,
    SegmentId,
    Title,
    Priority,
    Recommendations,
    TargetCount,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RewardRedemptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RewardRedemptions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RewardRedemptions::OrganizationId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardRedemptions::CustomerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardRedemptions::Code)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(RewardRedemptions::RewardType)
                            .custom(Alias::new("reward_type"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardRedemptions::Tier)
                            .custom(Alias::new("loyalty_tier_level"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(RewardRedemptions::PointsUsed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(RewardRedemptions::Description).text().null())
                    .col(
                        ColumnDef::new(RewardRedemptions::Status)
                            .custom(Alias::new("reward_status"))
                            .not_null()
                            .default(Expr::cust("'active'")),
                    )
                    // TIER- 码必须为 NULL
                    .col(
                        ColumnDef::new(RewardRedemptions::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(RewardRedemptions::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reward_redemptions_customer_tier")
                    .table(RewardRedemptions::Table)
                    .col(RewardRedemptions::CustomerId)
                    .col(RewardRedemptions::Tier)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Segments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Segments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Segments::OrganizationId).big_integer().not_null())
                    .col(ColumnDef::new(Segments::Name).string().not_null())
                    .col(ColumnDef::new(Segments::Description).text().null())
                    .col(ColumnDef::new(Segments::SegmentType).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Segments::IsSmart)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Segments::AutoUpdate)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Segments::Conditions).json_binary().null())
                    .col(
                        ColumnDef::new(Segments::CustomerCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Segments::LastEvaluatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Segments::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Segments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SegmentMembers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SegmentMembers::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SegmentMembers::SegmentId).big_integer().not_null())
                    .col(ColumnDef::new(SegmentMembers::CustomerId).big_integer().not_null())
                    .col(
                        ColumnDef::new(SegmentMembers::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_segment_members_segment")
                            .from(SegmentMembers::Table, SegmentMembers::SegmentId)
                            .to(Segments::Table, Segments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_segment_members_segment_customer")
                    .table(SegmentMembers::Table)
                    .col(SegmentMembers::SegmentId)
                    .col(SegmentMembers::CustomerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ActionPlans::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ActionPlans::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ActionPlans::OrganizationId)
                            .big_integer()
                            .not_null(),
                    )
                    // {organization_id}:{template}:{segment_id}
                    .col(
                        ColumnDef::new(ActionPlans::PlanKey)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ActionPlans::Template).string_len(64).not_null())
                    .col(ColumnDef::new(ActionPlans::SegmentId).big_integer().not_null())
                    .col(ColumnDef::new(ActionPlans::Title).string().not_null())
                    .col(ColumnDef::new(ActionPlans::Priority).string_len(16).not_null())
                    .col(
                        ColumnDef::new(ActionPlans::Recommendations)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ActionPlans::TargetCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ActionPlans::Status)
                            .custom(Alias::new("action_plan_status"))
                            .not_null()
                            .default(Expr::cust("'active'")),
                    )
                    .col(
                        ColumnDef::new(ActionPlans::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ActionPlans::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ActionPlans::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SegmentMembers::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Segments::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(RewardRedemptions::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
