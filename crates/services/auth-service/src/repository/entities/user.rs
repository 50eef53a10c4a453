//! User database entity for SeaORM.

use sea_orm::entity::prelude::*;
use sea_orm::Set;

use domain::{AuthProvider, Credentials, DomainError, User};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    /// NULL for federated accounts
    pub password_hash: Option<String>,
    pub profile_image_url: Option<String>,
    /// NULL for local accounts
    #[sea_orm(unique)]
    pub google_id: Option<String>,
    pub provider: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::refresh_token::Entity")]
    RefreshTokens,
}

impl Related<super::refresh_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RefreshTokens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Convert database model to domain entity, enforcing the provider invariant
impl TryFrom<Model> for User {
    type Error = DomainError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let provider: AuthProvider = model.provider.parse()?;
        let credentials = Credentials::from_parts(provider, model.password_hash, model.google_id)?;

        Ok(User {
            id: model.id,
            email: model.email,
            name: model.name,
            profile_image_url: model.profile_image_url,
            credentials,
            created_at: model.created_at,
        })
    }
}

impl From<&User> for ActiveModel {
    fn from(user: &User) -> Self {
        ActiveModel {
            id: Set(user.id),
            email: Set(user.email.clone()),
            name: Set(user.name.clone()),
            password_hash: Set(user.password_hash().map(str::to_string)),
            profile_image_url: Set(user.profile_image_url.clone()),
            google_id: Set(user.google_id().map(str::to_string)),
            provider: Set(user.provider().as_str().to_string()),
            created_at: Set(user.created_at),
        }
    }
}
