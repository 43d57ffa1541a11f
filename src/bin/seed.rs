use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use scentara_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        products::{ActiveModel as ProductActive, Column as ProductCol, Entity as Products},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    middleware::access::Role,
    services::auth_service::{DEFAULT_PROFILE_IMAGE, hash_password},
};

struct SeedProduct {
    name: &'static str,
    brand: &'static str,
    category: &'static str,
    fragrance_type: &'static str,
    volume: i32,
    price: i64,
    stock: i32,
    top: &'static [&'static str],
    middle: &'static [&'static str],
    base: &'static [&'static str],
    featured: bool,
}

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        name: "Bleu Nocturne",
        brand: "Maison Azur",
        category: "Men",
        fragrance_type: "Aromatic",
        volume: 100,
        price: 8_999,
        stock: 40,
        top: &["Grapefruit", "Mint"],
        middle: &["Lavender", "Geranium"],
        base: &["Vetiver", "Cedar"],
        featured: true,
    },
    SeedProduct {
        name: "Rose Lumière",
        brand: "Atelier Flora",
        category: "Women",
        fragrance_type: "Floral",
        volume: 50,
        price: 6_499,
        stock: 25,
        top: &["Pink Pepper"],
        middle: &["Damask Rose", "Peony"],
        base: &["White Musk"],
        featured: true,
    },
    SeedProduct {
        name: "Oud Sérénade",
        brand: "Dar Al Oud",
        category: "Unisex",
        fragrance_type: "Woody",
        volume: 75,
        price: 12_500,
        stock: 12,
        top: &["Saffron"],
        middle: &["Agarwood"],
        base: &["Amber", "Leather"],
        featured: false,
    },
    SeedProduct {
        name: "Citrus Drift",
        brand: "Maison Azur",
        category: "Unisex",
        fragrance_type: "Citrus",
        volume: 100,
        price: 4_999,
        stock: 60,
        top: &["Bergamot", "Lemon"],
        middle: &["Neroli"],
        base: &["Musk"],
        featured: false,
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "Store Admin", "admin@scentara.dev", "admin123", Role::Admin).await?;
    let user_id = ensure_user(&orm, "Sample Shopper", "user@scentara.dev", "user123", Role::User).await?;
    seed_products(&orm).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    orm: &DatabaseConnection,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?
    {
        let id = existing.id;
        let mut active: UserActive = existing.into();
        active.role = Set(role.to_string());
        active.update(orm).await?;
        println!("Ensured user {email} (role={role})");
        return Ok(id);
    }

    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        role: Set(role.to_string()),
        profile_image: Set(DEFAULT_PROFILE_IMAGE.to_string()),
        phone: Set(None),
        gender: Set(None),
        reset_otp: Set(None),
        reset_otp_expires_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(orm)
    .await?;

    println!("Created user {email} (role={role})");
    Ok(user.id)
}

async fn seed_products(orm: &DatabaseConnection) -> anyhow::Result<()> {
    let notes = |list: &[&str]| list.iter().map(|n| n.to_string()).collect::<Vec<_>>();

    for product in PRODUCTS {
        let exists = Products::find()
            .filter(ProductCol::Name.eq(product.name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        ProductActive {
            id: Set(Uuid::new_v4()),
            name: Set(product.name.to_string()),
            brand: Set(product.brand.to_string()),
            description: Set(Some(format!("{} by {}", product.name, product.brand))),
            category: Set(product.category.to_string()),
            fragrance_type: Set(Some(product.fragrance_type.to_string())),
            volume: Set(product.volume),
            price: Set(product.price),
            original_price: Set(None),
            stock: Set(product.stock),
            ingredients: Set(Vec::new()),
            top_notes: Set(notes(product.top)),
            middle_notes: Set(notes(product.middle)),
            base_notes: Set(notes(product.base)),
            image: Set(String::new()),
            rating: Set(0.0),
            is_featured: Set(product.featured),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
