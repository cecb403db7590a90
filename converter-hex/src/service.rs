//! Converter Application Service
//!
//! Orchestrates domain operations through the repository and rate provider ports.
//! Contains NO infrastructure logic - pure business orchestration.

use converter_types::domain::converter::validate_title;
use converter_types::domain::user::normalize_email;
use converter_types::error::messages;
use converter_types::validation::{validate_code, validate_unique};
use converter_types::{
    ApiKeyIssued, AppError, BootstrapRequest, Conversion, ConvertRequest, ConvertResponse,
    Converter, ConverterDetailResponse, ConverterId, ConverterRepository, ConverterResponse,
    CreateConverterRequest, CreateUserRequest, CurrencyCode, ErrorKind, Operation, RateProvider,
    RateTable, RepoError, UpdateConverterRequest, User, UserResponse, assign_owner, authorize,
    now_micros,
};

/// Application service for converter operations.
///
/// Generic over `R: ConverterRepository` and `P: RateProvider` - both adapters
/// are injected at compile time.
/// This enables:
/// - Swapping repositories or rate sources without code changes
/// - Testing with an in-memory repo and a scripted provider
/// - Compile-time checks for port implementation
pub struct ConverterService<R: ConverterRepository, P: RateProvider> {
    repo: R,
    rates: P,
}

impl<R: ConverterRepository, P: RateProvider> ConverterService<R, P> {
    /// Creates a new converter service with the given repository and provider.
    pub fn new(repo: R, rates: P) -> Self {
        Self { repo, rates }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Identity
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates the first user (staff + superuser) and their API key.
    ///
    /// Only allowed while the user table is empty.
    #[tracing::instrument(skip(self, req), fields(email = %req.email))]
    pub async fn bootstrap(&self, req: BootstrapRequest) -> Result<ApiKeyIssued, AppError> {
        if self.repo.count_users().await? > 0 {
            return Err(AppError::validation(
                ErrorKind::Bootstrap,
                "Bootstrap not allowed: users already exist. Ask a staff user for an API key.",
            ));
        }

        let user = User::new(&req.email, true, true)?;
        let issued = self
            .register(user, "First API key created. Save this key securely - it won't be shown again!")
            .await?;

        tracing::info!(user_id = %issued.user.id, "Bootstrap user created");
        Ok(issued)
    }

    /// Registers another user. Only staff may do this.
    #[tracing::instrument(skip(self, acting, req), fields(acting = %acting.email, email = %req.email))]
    pub async fn create_user(
        &self,
        acting: &User,
        req: CreateUserRequest,
    ) -> Result<ApiKeyIssued, AppError> {
        if !acting.is_staff {
            return Err(AppError::Forbidden(messages::FORBIDDEN.into()));
        }

        let user = User::new(&req.email, req.is_staff, false)?;
        self.register(user, "User created. Save this key securely - it won't be shown again!")
            .await
    }

    async fn register(&self, user: User, message: &str) -> Result<ApiKeyIssued, AppError> {
        let user = match self.repo.create_user(user).await {
            Ok(user) => user,
            Err(RepoError::Conflict(_)) => {
                return Err(AppError::validation(
                    ErrorKind::Email,
                    "A user with this email already exists.",
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let (_api_key, raw_key) = self.repo.create_api_key(user.id, "default").await?;

        Ok(ApiKeyIssued {
            user: UserResponse::from(&user),
            api_key: raw_key,
            message: message.into(),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Converter Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates a converter for the acting user with freshly fetched peer rates.
    ///
    /// Checks run in order: title, declared owner exists, whitelist, uniqueness
    /// for the declared owner, declared owner is the caller. Rates are fetched
    /// before anything is written, and the converter and its rate rows are
    /// inserted atomically.
    #[tracing::instrument(skip(self, acting, req), fields(user = %acting.email, code = %req.code))]
    pub async fn create_converter(
        &self,
        acting: &User,
        req: CreateConverterRequest,
    ) -> Result<ConverterResponse, AppError> {
        authorize(Some(acting), Operation::Create, None).into_result()?;

        let title = validate_title(&req.title)?;
        let declared = self.resolve_user(&req.converter_user).await?;
        let code = validate_code(&req.code)?;
        validate_unique(&self.repo, code, declared.id).await?;

        if declared.id != acting.id {
            return Err(AppError::validation(
                ErrorKind::ConverterUser,
                messages::FOREIGN_OWNER,
            ));
        }
        let owner = assign_owner(acting, declared.id);

        let table = self.fetch_rates(code).await?;
        let converter = Converter::new(&title, code, owner, &table)?;
        let converter = self.repo.insert_converter(converter).await?;

        tracing::info!(converter_id = %converter.id, rates = converter.rates.len(), "Converter created");
        Ok(ConverterResponse::from_domain(&converter, acting))
    }

    /// Gets a converter the acting user owns.
    #[tracing::instrument(skip(self, acting), fields(user = %acting.email))]
    pub async fn get_converter(
        &self,
        acting: &User,
        id: ConverterId,
    ) -> Result<ConverterDetailResponse, AppError> {
        let converter = self.load_owned(acting, id, Operation::Retrieve).await?;
        let owner = self.owner_of(&converter, acting).await?;
        Ok(ConverterDetailResponse::from_domain(&converter, &owner))
    }

    /// Refreshes every stored rate of a converter from the provider.
    ///
    /// The submitted code must be one the caller has a converter for. The
    /// rates refreshed are always those of the converter's own code; title and
    /// code never change and `changed` always moves forward.
    #[tracing::instrument(skip(self, acting, req), fields(user = %acting.email, code = %req.code))]
    pub async fn update_converter(
        &self,
        acting: &User,
        id: ConverterId,
        req: UpdateConverterRequest,
    ) -> Result<ConverterDetailResponse, AppError> {
        let mut converter = self.load_owned(acting, id, Operation::Update).await?;

        let code = validate_code(&req.code)?;
        if self.repo.find_converter(code, acting.id).await?.is_none() {
            return Err(AppError::validation(
                ErrorKind::WrongCode,
                messages::CURRENCY_NOT_ADDED,
            ));
        }

        let table = self.fetch_rates(converter.code).await?;
        converter.refresh(&table, now_micros())?;
        converter.owner = assign_owner(acting, converter.owner);
        self.repo.save_refresh(&converter).await?;

        tracing::info!(converter_id = %converter.id, changed = %converter.changed, "Converter refreshed");
        let owner = self.owner_of(&converter, acting).await?;
        Ok(ConverterDetailResponse::from_domain(&converter, &owner))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Conversion
    // ─────────────────────────────────────────────────────────────────────────────

    /// Converts `amount` units of the base currency using the acting user's
    /// stored rate. Never calls the provider.
    #[tracing::instrument(skip(self, acting, req), fields(user = %acting.email, base = %req.base_currency, target = %req.target_currency, amount = req.amount))]
    pub async fn convert(
        &self,
        acting: &User,
        req: ConvertRequest,
    ) -> Result<ConvertResponse, AppError> {
        authorize(Some(acting), Operation::Convert, None).into_result()?;

        let base = validate_code(&req.base_currency)?;
        let target = validate_code(&req.target_currency)?;

        let not_added =
            || AppError::validation(ErrorKind::ConverterUser, messages::NO_CONVERTER_FOR_USER);

        let converter = self
            .repo
            .find_converter(base, acting.id)
            .await?
            .ok_or_else(not_added)?;
        let rate = converter.rate_for(target).ok_or_else(not_added)?;

        let conversion = Conversion::compute(rate.rate, req.amount, base, target)?;
        Ok(conversion.into())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────────

    async fn load_owned(
        &self,
        acting: &User,
        id: ConverterId,
        op: Operation,
    ) -> Result<Converter, AppError> {
        let converter = self
            .repo
            .get_converter(id)
            .await?
            .ok_or_else(|| AppError::NotFound(messages::NOT_FOUND.into()))?;

        authorize(Some(acting), op, Some(converter.owner)).into_result()?;
        Ok(converter)
    }

    /// Looks up the user a request names by email.
    async fn resolve_user(&self, email: &str) -> Result<User, AppError> {
        let found = match normalize_email(email) {
            Ok(email) => self.repo.find_user_by_email(&email).await?,
            Err(_) => None,
        };
        found.ok_or_else(|| {
            AppError::validation(
                ErrorKind::ConverterUser,
                format!("Object with email={} does not exist.", email.trim()),
            )
        })
    }

    async fn owner_of(&self, converter: &Converter, acting: &User) -> Result<User, AppError> {
        if converter.owner == acting.id {
            return Ok(acting.clone());
        }
        self.repo
            .get_user(converter.owner)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Owner {} of converter is missing", converter.owner)))
    }

    async fn fetch_rates(&self, code: CurrencyCode) -> Result<RateTable, AppError> {
        self.rates.fetch_rates(code).await.map_err(|e| {
            tracing::warn!(error = %e, %code, "Rate provider unavailable");
            AppError::validation(ErrorKind::ServerApi, messages::RATES_UNAVAILABLE)
        })
    }
}
