use bigdecimal::BigDecimal;
use shared::*;
use tracing::info;
use uuid::Uuid;

use crate::handlers::BakeryService;

// (username, password, role, name, email, phone)
const SAMPLE_USERS: [(&str, &str, Role, &str, &str, &str); 5] = [
    ("admin", "admin", Role::Admin, "Admin User", "admin@bakery.com", "123-456-7890"),
    ("staff1", "staff1", Role::Staff, "John Baker", "john@bakery.com", "123-456-7891"),
    ("staff2", "staff2", Role::Staff, "Sarah Chef", "sarah@bakery.com", "123-456-7892"),
    ("customer1", "customer1", Role::Customer, "Alice Johnson", "alice@example.com", "123-456-7893"),
    ("customer2", "customer2", Role::Customer, "Bob Smith", "bob@example.com", "123-456-7894"),
];

// (name, flavor, size, price in cents, stock, description, category)
const SAMPLE_CAKES: [(&str, &str, &str, i64, i32, &str, &str); 6] = [
    ("Chocolate Birthday Cake", "chocolate", "medium", 3500, 5, "Delicious chocolate cake with buttercream frosting", "birthday"),
    ("Vanilla Wedding Cake", "vanilla", "large", 12000, 2, "Elegant vanilla wedding cake with fondant", "wedding"),
    ("Strawberry Anniversary Cake", "strawberry", "medium", 6500, 3, "Fresh strawberry cake with cream filling", "anniversary"),
    ("Red Velvet Celebration", "red-velvet", "large", 8500, 4, "Classic red velvet cake with cream cheese frosting", "celebration"),
    ("Carrot Cake", "carrot", "small", 2500, 8, "Moist carrot cake with walnuts and cream cheese frosting", "regular"),
    ("Lemon Drizzle Cake", "lemon", "small", 2000, 10, "Tangy lemon cake with lemon glaze", "regular"),
];

// (item name, category, quantity, unit, min stock level)
const SAMPLE_INVENTORY: [(&str, &str, f64, &str, f64); 6] = [
    ("Flour", "baking", 100.0, "lbs", 20.0),
    ("Sugar", "baking", 50.0, "lbs", 10.0),
    ("Butter", "dairy", 30.0, "lbs", 5.0),
    ("Eggs", "dairy", 200.0, "pieces", 50.0),
    ("Chocolate", "baking", 15.0, "lbs", 8.0),
    ("Vanilla Extract", "flavoring", 5.0, "liters", 1.0),
];

impl BakeryService {
    /// Fills an empty store with demo accounts, cakes and inventory.
    /// Returns false without touching anything if any user exists.
    pub async fn seed_sample_data(&self) -> BakeryResult<bool> {
        if self.store().user_count().await? > 0 {
            return Ok(false);
        }

        for (username, password, role, name, email, phone) in SAMPLE_USERS {
            let new_user = NewUser {
                username: username.to_string(),
                password: password.to_string(),
                name: name.to_string(),
                email: email.to_string(),
                phone: Some(phone.to_string()),
            };
            self.create_user(new_user, role).await?;
        }

        let now = self.now();
        for (name, flavor, size, cents, stock, description, category) in SAMPLE_CAKES {
            let cake = Cake {
                id: Uuid::new_v4(),
                name: name.to_string(),
                flavor: flavor.to_string(),
                size: size.to_string(),
                price: BigDecimal::new(cents.into(), 2),
                stock,
                category: category.to_string(),
                description: description.to_string(),
                created_at: now,
            };
            self.store().insert_cake(&cake).await?;
        }

        for (item_name, category, quantity, unit, min_stock_level) in SAMPLE_INVENTORY {
            let item = InventoryItem {
                id: Uuid::new_v4(),
                item_name: item_name.to_string(),
                category: category.to_string(),
                quantity,
                unit: unit.to_string(),
                min_stock_level,
                last_updated: now,
            };
            self.store().insert_inventory_item(&item).await?;
        }

        info!(
            users = SAMPLE_USERS.len(),
            cakes = SAMPLE_CAKES.len(),
            inventory = SAMPLE_INVENTORY.len(),
            "Seeded sample data"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use crate::notify::LogNotifier;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_seed_only_runs_once() {
        let service = BakeryService::new(Arc::new(MemoryStore::new()), Arc::new(LogNotifier));
        assert!(service.seed_sample_data().await.unwrap());
        assert!(!service.seed_sample_data().await.unwrap());

        let admin = service
            .authenticate("admin", "admin", Role::Admin)
            .await
            .unwrap();
        assert_eq!(admin.name, "Admin User");

        let cakes = service.list_cakes(None, None).await.unwrap();
        assert_eq!(cakes.len(), 6);
        let wedding = cakes.iter().find(|c| c.category == "wedding").unwrap();
        assert_eq!(wedding.price, "120.00".parse::<BigDecimal>().unwrap());
    }
}
