//! Development data: one admin, one customer, a small catalog and a few
//! promotion codes. Prints a bearer token for each user.

use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use giftharmony_orders::{
    db::{create_orm_conn, run_migrations},
    entity::{
        products::{self, ActiveModel as ProductActive, Entity as Products},
        promotions::{self, ActiveModel as PromotionActive, Entity as Promotions},
        users::{self, ActiveModel as UserActive, Entity as Users},
    },
    middleware::auth::{ADMIN_ROLE, Claims},
    models::DiscountKind,
};

const TOKEN_TTL_DAYS: i64 = 7;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL is not set"))?;
    let secret =
        std::env::var("JWT_SECRET").map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "admin@giftharmony.test", ADMIN_ROLE).await?;
    let user_id = ensure_user(&orm, "customer@giftharmony.test", "user").await?;
    seed_products(&orm).await?;
    seed_promotions(&orm).await?;

    println!("Seed completed.");
    println!("Admin    {admin_id}\n  Bearer {}", mint_token(&secret, admin_id, ADMIN_ROLE)?);
    println!("Customer {user_id}\n  Bearer {}", mint_token(&secret, user_id, "user")?);
    Ok(())
}

async fn ensure_user(orm: &DatabaseConnection, email: &str, role: &str) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(users::Column::Email.eq(email))
        .one(orm)
        .await?
    {
        let id = existing.id;
        if existing.role != role {
            let mut active: UserActive = existing.into();
            active.role = Set(role.to_string());
            active.update(orm).await?;
        }
        return Ok(id);
    }

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        role: Set(role.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user.id)
}

async fn seed_products(orm: &DatabaseConnection) -> anyhow::Result<()> {
    let catalog = [
        ("Rose Gold Gift Box", "Chocolates and a handwritten card", 350_000, 40),
        ("Scented Candle Trio", "Lavender, vanilla and cedar", 180_000, 60),
        ("Personalised Mug", "Printed with a name of your choice", 120_000, 100),
        ("Luxury Hamper", "Tea, biscuits and preserves", 750_000, 15),
        ("Last Orchid", "Only one left in the greenhouse", 100_000, 1),
    ];

    for (name, description, price, stock) in catalog {
        let exists = Products::find()
            .filter(products::Column::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }
        ProductActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(Some(description.to_string())),
            price: Set(price),
            stock: Set(stock),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}

async fn seed_promotions(orm: &DatabaseConnection) -> anyhow::Result<()> {
    let now = Utc::now();
    let codes = [
        ("SAVE10", DiscountKind::FixedAmount, 10_000, None, 50_000, Some(5)),
        ("GIFT15", DiscountKind::Percentage, 15, Some(75_000), 200_000, None),
        ("FREESHIP", DiscountKind::FreeShipping, 0, None, 100_000, Some(100)),
    ];

    for (code, kind, value, max_discount, min_order, usage_limit) in codes {
        let exists = Promotions::find()
            .filter(promotions::Column::Code.eq(code))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }
        PromotionActive {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            description: Set(None),
            kind: Set(kind),
            value: Set(value),
            max_discount: Set(max_discount),
            min_order: Set(min_order),
            starts_at: Set(Some(now.into())),
            ends_at: Set(Some((now + Duration::days(90)).into())),
            usage_limit: Set(usage_limit),
            usage_count: Set(0),
            is_active: Set(true),
            created_at: Set(now.into()),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded promotions");
    Ok(())
}

fn mint_token(secret: &str, user_id: Uuid, role: &str) -> anyhow::Result<String> {
    let exp = (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}
