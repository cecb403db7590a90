//! SQLite repository integration tests.

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use converter_types::{
        Converter, ConverterId, ConverterRepository, CurrencyCode, RateTable, RepoError, User,
        UserId,
    };
    use rust_decimal::Decimal;
    use std::str::FromStr;

    use crate::SqliteRepo;
    use crate::security::hash_api_key;

    async fn setup_repo() -> SqliteRepo {
        SqliteRepo::new("sqlite::memory:").await.unwrap()
    }

    async fn add_user(repo: &SqliteRepo, email: &str) -> User {
        repo.create_user(User::new(email, false, false).unwrap())
            .await
            .unwrap()
    }

    fn usd_table() -> RateTable {
        RateTable::new(
            CurrencyCode::USD,
            vec![
                (CurrencyCode::GBP, Decimal::from_str("0.79").unwrap()),
                (CurrencyCode::EUR, Decimal::from_str("0.92").unwrap()),
                (CurrencyCode::CNY, Decimal::from_str("7.123456").unwrap()),
            ],
        )
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let repo = setup_repo().await;
        let user = add_user(&repo, "test@test.com").await;

        let fetched = repo.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(fetched, user);

        let by_email = repo.find_user_by_email("TEST@test.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(repo.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let repo = setup_repo().await;
        add_user(&repo, "test@test.com").await;

        let result = repo
            .create_user(User::new("test@test.com", true, false).unwrap())
            .await;

        assert!(matches!(result, Err(RepoError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_api_key_authenticates_its_user() {
        let repo = setup_repo().await;
        let user = add_user(&repo, "test@test.com").await;

        let (key, raw) = repo.create_api_key(user.id, "default").await.unwrap();
        assert_eq!(key.user_id, user.id);
        assert_eq!(key.key_hash, hash_api_key(&raw));

        let authed = repo.authenticate(&hash_api_key(&raw)).await.unwrap();
        assert_eq!(authed.map(|u| u.id), Some(user.id));

        let unknown = repo.authenticate(&hash_api_key("sk_nope")).await.unwrap();
        assert!(unknown.is_none());
    }

    #[tokio::test]
    async fn test_insert_and_get_converter() {
        let repo = setup_repo().await;
        let user = add_user(&repo, "test@test.com").await;

        let converter = Converter::new("Dollars", CurrencyCode::USD, user.id, &usd_table()).unwrap();
        let inserted = repo.insert_converter(converter.clone()).await.unwrap();

        let fetched = repo.get_converter(inserted.id).await.unwrap().unwrap();

        assert_eq!(fetched, converter);
        assert_eq!(
            fetched.rate_for(CurrencyCode::GBP).unwrap().rate.to_string(),
            "0.790000"
        );
        assert_eq!(repo.count_converters().await.unwrap(), 1);
        assert_eq!(repo.count_rates().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_get_converter_not_found() {
        let repo = setup_repo().await;

        let result = repo.get_converter(ConverterId::new()).await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_find_converter_is_per_owner() {
        let repo = setup_repo().await;
        let alice = add_user(&repo, "alice@test.com").await;
        let bob = add_user(&repo, "bob@test.com").await;

        let converter = Converter::new("Dollars", CurrencyCode::USD, alice.id, &usd_table()).unwrap();
        repo.insert_converter(converter.clone()).await.unwrap();

        let found = repo.find_converter(CurrencyCode::USD, alice.id).await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(converter.id));

        assert!(repo.find_converter(CurrencyCode::USD, bob.id).await.unwrap().is_none());
        assert!(repo.find_converter(CurrencyCode::EUR, alice.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_for_owner_conflicts_and_rolls_back() {
        let repo = setup_repo().await;
        let user = add_user(&repo, "test@test.com").await;

        repo.insert_converter(Converter::new("Dollars", CurrencyCode::USD, user.id, &usd_table()).unwrap())
            .await
            .unwrap();

        let result = repo
            .insert_converter(Converter::new("Again", CurrencyCode::USD, user.id, &usd_table()).unwrap())
            .await;

        assert!(matches!(result, Err(RepoError::Conflict(_))));
        assert_eq!(repo.count_converters().await.unwrap(), 1);
        assert_eq!(repo.count_rates().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_same_code_for_different_owners() {
        let repo = setup_repo().await;
        let alice = add_user(&repo, "alice@test.com").await;
        let bob = add_user(&repo, "bob@test.com").await;

        for owner in [alice.id, bob.id] {
            repo.insert_converter(Converter::new("Dollars", CurrencyCode::USD, owner, &usd_table()).unwrap())
                .await
                .unwrap();
        }

        assert_eq!(repo.count_converters().await.unwrap(), 2);
        assert_eq!(repo.count_rates().await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_save_refresh_updates_in_place() {
        let repo = setup_repo().await;
        let user = add_user(&repo, "test@test.com").await;

        let mut converter = repo
            .insert_converter(Converter::new("Dollars", CurrencyCode::USD, user.id, &usd_table()).unwrap())
            .await
            .unwrap();
        let rate_ids: Vec<_> = converter.rates.iter().map(|r| r.id).collect();
        let created = converter.created;

        let fresh = RateTable::new(
            CurrencyCode::USD,
            vec![
                (CurrencyCode::GBP, Decimal::from_str("0.8").unwrap()),
                (CurrencyCode::EUR, Decimal::from_str("0.93").unwrap()),
                (CurrencyCode::CNY, Decimal::from_str("7.2").unwrap()),
            ],
        );
        converter
            .refresh(&fresh, created + Duration::seconds(1))
            .unwrap();
        repo.save_refresh(&converter).await.unwrap();

        let fetched = repo.get_converter(converter.id).await.unwrap().unwrap();
        assert_eq!(fetched.rates.iter().map(|r| r.id).collect::<Vec<_>>(), rate_ids);
        assert_eq!(
            fetched.rate_for(CurrencyCode::CNY).unwrap().rate.to_string(),
            "7.200000"
        );
        assert_eq!(fetched.created, created);
        assert_eq!(fetched.changed, created + Duration::seconds(1));
        assert_eq!(repo.count_rates().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_save_refresh_missing_converter() {
        let repo = setup_repo().await;
        let converter = Converter::new("Dollars", CurrencyCode::USD, UserId::new(), &usd_table()).unwrap();

        let result = repo.save_refresh(&converter).await;

        assert!(matches!(result, Err(RepoError::NotFound)));
    }
}
