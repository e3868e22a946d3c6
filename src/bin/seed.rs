use chrono::Utc;
use orders_api::{
    config::AppConfig,
    db::{OrmConn, create_orm_conn, run_migrations},
    entity::{
        contractors::{ActiveModel as ContractorActive, Column as ContractorCol, Entity as Contractors},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    services::auth_service::hash_password,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "admin@example.com", "Admin1234", true).await?;
    let user_id = ensure_user(&orm, "user@example.com", "User12345", false).await?;
    seed_contractors(&orm).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

/// Creates the account, or resets password, role and activation if it exists.
async fn ensure_user(
    orm: &OrmConn,
    email: &str,
    password: &str,
    is_admin: bool,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let existing = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?;

    let user = match existing {
        Some(user) => {
            let mut active: UserActive = user.into();
            active.password_hash = Set(password_hash);
            active.is_admin = Set(is_admin);
            active.is_active = Set(true);
            active.activation_token = Set(None);
            active.update(orm).await?
        }
        None => {
            UserActive {
                id: Set(Uuid::new_v4()),
                email: Set(email.to_string()),
                first_name: Set(if is_admin { "Admin" } else { "Demo" }.to_string()),
                last_name: Set("User".to_string()),
                password_hash: Set(password_hash),
                is_admin: Set(is_admin),
                is_active: Set(true),
                activation_token: Set(None),
                reset_token: Set(None),
                reset_token_expires_at: Set(None),
                created_at: Set(Utc::now().fixed_offset()),
            }
            .insert(orm)
            .await?
        }
    };

    println!("Ensured user {email} (admin={is_admin})");
    Ok(user.id)
}

async fn seed_contractors(orm: &OrmConn) -> anyhow::Result<()> {
    let names = ["Acme Supplies", "Globex Logistics", "Initech Components"];

    for name in names {
        let exists = Contractors::find()
            .filter(ContractorCol::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }
        ContractorActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            created_at: Set(Utc::now().fixed_offset()),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded contractors");
    Ok(())
}
