use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create the platform's schema
        manager
            .get_connection()
            .execute_unprepared("CREATE SCHEMA IF NOT EXISTS agora_platform;")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("SET search_path TO agora_platform, public;")
            .await?;

        // Grant the base DB user that executes all platform queries
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DO $$ BEGIN
                    GRANT ALL PRIVILEGES ON DATABASE agora TO agora;
                    GRANT ALL ON SCHEMA agora_platform TO agora;

                    ALTER DEFAULT PRIVILEGES IN SCHEMA agora_platform GRANT ALL ON TABLES TO agora;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA agora_platform GRANT ALL ON SEQUENCES TO agora;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA agora_platform GRANT ALL ON FUNCTIONS TO agora;
                END $$;
            "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Revoke default privileges first
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DO $$ BEGIN
                    ALTER DEFAULT PRIVILEGES IN SCHEMA agora_platform REVOKE ALL ON FUNCTIONS FROM agora;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA agora_platform REVOKE ALL ON SEQUENCES FROM agora;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA agora_platform REVOKE ALL ON TABLES FROM agora;
                    REVOKE ALL ON SCHEMA agora_platform FROM agora;
                    REVOKE ALL PRIVILEGES ON DATABASE agora FROM agora;
                END $$;
            "#,
            )
            .await?;

        // Drop the schema (CASCADE will remove all objects in it)
        manager
            .get_connection()
            .execute_unprepared("DROP SCHEMA IF EXISTS agora_platform CASCADE;")
            .await?;

        Ok(())
    }
}
