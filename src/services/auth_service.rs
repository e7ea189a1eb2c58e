use crate::config::AuthConfig;
use crate::entities::{user_entity as users, verification_code_entity as codes};
use crate::error::{AppError, AppResult};
use crate::external::SmsService;
use crate::utils::{SessionIssuer, generate_six_digit_code, normalize_phone};
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};

pub const CODE_TTL_MINUTES: i64 = 5;

#[derive(Debug, Clone)]
pub struct IssuedCode {
    pub phone: String,
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct VerifiedLogin {
    pub user: users::Model,
    pub session_token: String,
}

#[derive(Clone)]
pub struct AuthService {
    pool: DatabaseConnection,
    session_issuer: SessionIssuer,
    sms_service: SmsService,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(
        pool: DatabaseConnection,
        session_issuer: SessionIssuer,
        sms_service: SmsService,
        config: AuthConfig,
    ) -> Self {
        Self {
            pool,
            session_issuer,
            sms_service,
            config,
        }
    }

    pub fn exposes_dev_code(&self) -> bool {
        self.config.expose_dev_code
    }

    pub fn session_issuer(&self) -> &SessionIssuer {
        &self.session_issuer
    }

    /// Issue a fresh code for `phone` and hand it to the SMS channel.
    pub async fn send_code(&self, phone: &str) -> AppResult<IssuedCode> {
        let phone = normalize_phone(phone)?;

        let code = generate_six_digit_code();
        let issued_at = Utc::now();
        let expires_at = issued_at + Duration::minutes(CODE_TTL_MINUTES);

        let txn = self.pool.begin().await?;

        if self.config.invalidate_previous_codes {
            let res = codes::Entity::update_many()
                .col_expr(codes::Column::Verified, Expr::value(true))
                .filter(codes::Column::Phone.eq(phone))
                .filter(codes::Column::Verified.eq(false))
                .exec(&txn)
                .await?;
            if res.rows_affected > 0 {
                log::debug!(
                    "Invalidated {} outstanding code(s) for {phone}",
                    res.rows_affected
                );
            }
        }

        codes::ActiveModel {
            phone: Set(phone.to_string()),
            code: Set(code.clone()),
            expires_at: Set(expires_at),
            verified: Set(false),
            created_at: Set(issued_at),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        self.sms_service.send_verification_code(phone, &code).await?;

        Ok(IssuedCode {
            phone: phone.to_string(),
            code,
            issued_at,
            expires_at,
        })
    }

    /// Consume a live code and resolve the phone's identity.
    ///
    /// The code flip and the user lookup-or-create share one transaction.
    /// Concurrent callers racing on the same code are serialized by the
    /// conditional update; racing on the same new phone by the unique index.
    pub async fn verify_code(
        &self,
        phone: &str,
        code: &str,
        name: Option<&str>,
    ) -> AppResult<VerifiedLogin> {
        let phone = phone.trim();
        let code = code.trim();
        if phone.is_empty() || code.is_empty() {
            return Err(AppError::ValidationError(
                "Phone and code are required".to_string(),
            ));
        }
        let name = name.map(str::trim).filter(|n| !n.is_empty());

        let now = Utc::now();
        let txn = self.pool.begin().await?;

        let record = codes::Entity::find()
            .filter(codes::Column::Phone.eq(phone))
            .filter(codes::Column::Code.eq(code))
            .filter(codes::Column::Verified.eq(false))
            .filter(codes::Column::ExpiresAt.gt(now))
            .order_by_desc(codes::Column::CreatedAt)
            .order_by_desc(codes::Column::Id)
            .one(&txn)
            .await?
            .ok_or(AppError::InvalidOrExpiredCode)?;

        let consumed = codes::Entity::update_many()
            .col_expr(codes::Column::Verified, Expr::value(true))
            .filter(codes::Column::Id.eq(record.id))
            .filter(codes::Column::Verified.eq(false))
            .exec(&txn)
            .await?;
        if consumed.rows_affected != 1 {
            // someone else consumed it between our read and write
            return Err(AppError::InvalidOrExpiredCode);
        }

        let user = Self::resolve_user(&txn, phone, name, now).await?;

        txn.commit().await?;

        let session_token = self.session_issuer.issue(user.id, &user.phone)?;
        log::info!("Phone verified, user {} signed in", user.id);

        Ok(VerifiedLogin {
            user,
            session_token,
        })
    }

    async fn resolve_user(
        txn: &DatabaseTransaction,
        phone: &str,
        name: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<users::Model> {
        let existing = users::Entity::find()
            .filter(users::Column::Phone.eq(phone))
            .one(txn)
            .await?;

        let user = match existing {
            Some(user) => user,
            None => {
                let model = users::ActiveModel {
                    phone: Set(phone.to_string()),
                    name: Set(name.map(str::to_string)),
                    created_at: Set(Some(now)),
                    updated_at: Set(Some(now)),
                    ..Default::default()
                };
                users::Entity::insert(model)
                    .on_conflict(
                        OnConflict::column(users::Column::Phone)
                            .do_nothing()
                            .to_owned(),
                    )
                    .exec_without_returning(txn)
                    .await?;

                // either our row or the one a concurrent verification committed
                users::Entity::find()
                    .filter(users::Column::Phone.eq(phone))
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        AppError::InternalError(format!("User for {phone} missing after insert"))
                    })?
            }
        };

        match name {
            Some(name) if user.name.is_none() => {
                let mut am = user.into_active_model();
                am.name = Set(Some(name.to_string()));
                am.updated_at = Set(Some(now));
                Ok(am.update(txn).await?)
            }
            _ => Ok(user),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SmsConfig;
    use crate::database::{file_test_pool, test_pool};
    use std::path::PathBuf;

    async fn service_with(config: AuthConfig) -> AuthService {
        AuthService::new(
            test_pool().await,
            SessionIssuer::new("test-secret", 3600),
            SmsService::new(SmsConfig::default()),
            config,
        )
    }

    async fn service() -> AuthService {
        service_with(AuthConfig::default()).await
    }

    async fn shared_file_service() -> (AuthService, PathBuf) {
        let (pool, path) = file_test_pool(4).await;
        let svc = AuthService::new(
            pool,
            SessionIssuer::new("test-secret", 3600),
            SmsService::new(SmsConfig::default()),
            AuthConfig::default(),
        );
        (svc, path)
    }

    // SQLite admits one writer; a transaction that loses the upgrade race
    // fails with "database is locked" rather than waiting.
    fn lost_race(err: &AppError) -> bool {
        matches!(
            err,
            AppError::InvalidOrExpiredCode | AppError::DatabaseError(_)
        )
    }

    #[tokio::test]
    async fn test_send_code_rejects_short_phone() {
        let svc = service().await;
        assert!(matches!(
            svc.send_code("555123").await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            svc.send_code("   ").await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_send_code_issues_six_digits_for_five_minutes() {
        let svc = service().await;
        let issued = svc.send_code(" 5551234567 ").await.unwrap();
        assert_eq!(issued.phone, "5551234567");
        assert_eq!(issued.code.len(), 6);
        assert!(issued.code.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(issued.expires_at - issued.issued_at, Duration::minutes(5));

        let stored = codes::Entity::find()
            .filter(codes::Column::Phone.eq("5551234567"))
            .one(&svc.pool)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.code, issued.code);
        assert!(!stored.verified);
        assert!(stored.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn test_verify_succeeds_exactly_once() {
        let svc = service().await;
        let issued = svc.send_code("5551234567").await.unwrap();

        let login = svc
            .verify_code("5551234567", &issued.code, Some("Alex"))
            .await
            .unwrap();
        assert_eq!(login.user.phone, "5551234567");
        assert_eq!(login.user.name.as_deref(), Some("Alex"));

        let claims = svc
            .session_issuer()
            .decode(Some(&login.session_token))
            .unwrap();
        assert_eq!(claims.user_id().unwrap(), login.user.id);

        assert!(matches!(
            svc.verify_code("5551234567", &issued.code, None).await,
            Err(AppError::InvalidOrExpiredCode)
        ));
    }

    #[tokio::test]
    async fn test_verify_requires_phone_and_code() {
        let svc = service().await;
        assert!(matches!(
            svc.verify_code("", "123456", None).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            svc.verify_code("5551234567", " ", None).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_code_is_rejected() {
        let svc = service().await;
        let issued = svc.send_code("5551234567").await.unwrap();
        let wrong = if issued.code == "000000" { "111111" } else { "000000" };
        assert!(matches!(
            svc.verify_code("5551234567", wrong, None).await,
            Err(AppError::InvalidOrExpiredCode)
        ));
        // a code issued for one phone is useless for another
        assert!(matches!(
            svc.verify_code("5559999999", &issued.code, None).await,
            Err(AppError::InvalidOrExpiredCode)
        ));
    }

    #[tokio::test]
    async fn test_expired_code_is_rejected() {
        let svc = service().await;
        let past = Utc::now() - Duration::minutes(10);
        codes::ActiveModel {
            phone: Set("5551234567".to_string()),
            code: Set("482913".to_string()),
            expires_at: Set(past + Duration::minutes(CODE_TTL_MINUTES)),
            verified: Set(false),
            created_at: Set(past),
            ..Default::default()
        }
        .insert(&svc.pool)
        .await
        .unwrap();

        assert!(matches!(
            svc.verify_code("5551234567", "482913", None).await,
            Err(AppError::InvalidOrExpiredCode)
        ));
    }

    #[tokio::test]
    async fn test_identity_is_reused_and_name_backfilled_once() {
        let svc = service().await;

        let first = svc.send_code("5551234567").await.unwrap();
        let a = svc
            .verify_code("5551234567", &first.code, None)
            .await
            .unwrap();
        assert!(a.user.name.is_none());

        let second = svc.send_code("5551234567").await.unwrap();
        let b = svc
            .verify_code("5551234567", &second.code, Some("  Alex "))
            .await
            .unwrap();
        assert_eq!(b.user.id, a.user.id);
        assert_eq!(b.user.name.as_deref(), Some("Alex"));

        let third = svc.send_code("5551234567").await.unwrap();
        let c = svc
            .verify_code("5551234567", &third.code, Some("Bob"))
            .await
            .unwrap();
        assert_eq!(c.user.id, a.user.id);
        assert_eq!(c.user.name.as_deref(), Some("Alex"));

        let count = users::Entity::find()
            .filter(users::Column::Phone.eq("5551234567"))
            .all(&svc.pool)
            .await
            .unwrap()
            .len();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_new_code_invalidates_outstanding_ones() {
        let svc = service().await;
        let old = svc.send_code("5551234567").await.unwrap();
        let new = svc.send_code("5551234567").await.unwrap();

        if old.code != new.code {
            assert!(matches!(
                svc.verify_code("5551234567", &old.code, None).await,
                Err(AppError::InvalidOrExpiredCode)
            ));
        }
        assert!(svc.verify_code("5551234567", &new.code, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_outstanding_codes_coexist_when_invalidation_is_off() {
        let svc = service_with(AuthConfig {
            expose_dev_code: true,
            invalidate_previous_codes: false,
        })
        .await;
        assert!(svc.exposes_dev_code());

        let old = svc.send_code("5551234567").await.unwrap();
        let new = svc.send_code("5551234567").await.unwrap();

        let a = svc.verify_code("5551234567", &new.code, None).await.unwrap();
        if old.code != new.code {
            let b = svc.verify_code("5551234567", &old.code, None).await.unwrap();
            assert_eq!(a.user.id, b.user.id);
        }
    }

    #[tokio::test]
    async fn test_latest_matching_row_is_consumed() {
        let svc = service_with(AuthConfig {
            expose_dev_code: false,
            invalidate_previous_codes: false,
        })
        .await;
        let now = Utc::now();
        for offset in [2, 1] {
            codes::ActiveModel {
                phone: Set("5551234567".to_string()),
                code: Set("111222".to_string()),
                expires_at: Set(now + Duration::minutes(CODE_TTL_MINUTES)),
                verified: Set(false),
                created_at: Set(now - Duration::seconds(offset)),
                ..Default::default()
            }
            .insert(&svc.pool)
            .await
            .unwrap();
        }

        svc.verify_code("5551234567", "111222", None).await.unwrap();

        let rows = codes::Entity::find()
            .filter(codes::Column::Phone.eq("5551234567"))
            .order_by_asc(codes::Column::CreatedAt)
            .all(&svc.pool)
            .await
            .unwrap();
        assert!(!rows[0].verified);
        assert!(rows[1].verified);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_verifications_consume_a_code_once() {
        let (svc, path) = shared_file_service().await;

        for _ in 0..5 {
            let issued = svc.send_code("5551234567").await.unwrap();
            let (a, b) = tokio::join!(
                svc.verify_code("5551234567", &issued.code, None),
                svc.verify_code("5551234567", &issued.code, None),
            );

            let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
            assert_eq!(winners, 1, "{a:?} / {b:?}");
            for err in [&a, &b].into_iter().filter_map(|r| r.as_ref().err()) {
                assert!(lost_race(err), "unexpected error: {err:?}");
            }

            let live = codes::Entity::find()
                .filter(codes::Column::Phone.eq("5551234567"))
                .filter(codes::Column::Verified.eq(false))
                .all(&svc.pool)
                .await
                .unwrap();
            assert!(live.is_empty());
        }

        let accounts = users::Entity::find().all(&svc.pool).await.unwrap();
        assert_eq!(accounts.len(), 1);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_first_sign_ins_share_one_user() {
        let (svc, path) = shared_file_service().await;
        let phone = "5557654321";

        let resolve = |name: Option<&'static str>| {
            let pool = svc.pool.clone();
            async move {
                let txn = pool.begin().await?;
                let user = AuthService::resolve_user(&txn, phone, name, Utc::now()).await?;
                txn.commit().await?;
                Ok::<_, AppError>(user)
            }
        };
        let (a, b) = tokio::join!(resolve(Some("Alex")), resolve(None));

        let ids: Vec<i64> = [&a, &b]
            .into_iter()
            .filter_map(|r| r.as_ref().ok())
            .map(|u| u.id)
            .collect();
        assert!(!ids.is_empty(), "{a:?} / {b:?}");
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        for err in [&a, &b].into_iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(err, AppError::DatabaseError(_)), "{err:?}");
        }

        let rows = users::Entity::find()
            .filter(users::Column::Phone.eq(phone))
            .all(&svc.pool)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        // a retry after the race lands on the existing row
        let txn = svc.pool.begin().await.unwrap();
        let again = AuthService::resolve_user(&txn, phone, Some("Bob"), Utc::now())
            .await
            .unwrap();
        txn.commit().await.unwrap();
        assert_eq!(again.id, rows[0].id);

        let _ = std::fs::remove_file(path);
    }
}
