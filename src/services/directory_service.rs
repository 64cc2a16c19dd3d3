//! Directory Service - persons, companies, parks and categories

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, FieldErrors};
use crate::models::category::{self, Entity as Category};
use crate::models::company::{self, Entity as Company};
use crate::models::park::{self, Entity as Park};
use crate::models::person::{self, Entity as Person};
use crate::models::sub_category::{self, Entity as SubCategory};

fn required(field: &str, value: &str, errors: &mut FieldErrors) {
    if value.trim().is_empty() {
        errors.add(field, "This field is required");
    }
}

/// Trims optional text, empty strings become `None`
fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// --- Persons ---

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePersonInput {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_id: Option<i32>,
}

pub async fn list_persons(db: &DatabaseConnection) -> Result<Vec<person::Model>, DomainError> {
    Ok(Person::find()
        .order_by_asc(person::Column::LastName)
        .order_by_asc(person::Column::FirstName)
        .all(db)
        .await?)
}

pub async fn get_person(db: &DatabaseConnection, id: i32) -> Result<person::Model, DomainError> {
    Person::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::not_found("person", id))
}

pub async fn create_person(
    db: &DatabaseConnection,
    input: CreatePersonInput,
) -> Result<person::Model, DomainError> {
    let mut errors = FieldErrors::new();
    required("first_name", &input.first_name, &mut errors);
    required("last_name", &input.last_name, &mut errors);
    if let Some(email) = &input.email
        && !email.trim().is_empty()
        && !email.contains('@')
    {
        errors.add("email", "This email address is not valid");
    }
    if let Some(company_id) = input.company_id
        && Company::find_by_id(company_id).one(db).await?.is_none()
    {
        errors.add("company_id", format!("Company #{} not found", company_id));
    }
    errors.into_result()?;

    let now = Utc::now().to_rfc3339();
    let person = person::ActiveModel {
        first_name: Set(input.first_name.trim().to_string()),
        last_name: Set(input.last_name.trim().to_string()),
        email: Set(optional(input.email)),
        phone: Set(optional(input.phone)),
        company_id: Set(input.company_id),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!("Created person #{}", person.id);
    Ok(person)
}

pub async fn delete_person(db: &DatabaseConnection, id: i32) -> Result<(), DomainError> {
    let person = get_person(db, id).await?;
    person.delete(db).await?;
    Ok(())
}

// --- Companies ---

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCompanyInput {
    pub legal_name: String,
    pub phone: Option<String>,
    pub note: Option<String>,
}

pub async fn list_companies(db: &DatabaseConnection) -> Result<Vec<company::Model>, DomainError> {
    Ok(Company::find()
        .order_by_asc(company::Column::LegalName)
        .all(db)
        .await?)
}

pub async fn get_company(db: &DatabaseConnection, id: i32) -> Result<company::Model, DomainError> {
    Company::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::not_found("company", id))
}

pub async fn create_company(
    db: &DatabaseConnection,
    input: CreateCompanyInput,
) -> Result<company::Model, DomainError> {
    let mut errors = FieldErrors::new();
    required("legal_name", &input.legal_name, &mut errors);
    errors.into_result()?;

    let now = Utc::now().to_rfc3339();
    Ok(company::ActiveModel {
        legal_name: Set(input.legal_name.trim().to_string()),
        phone: Set(optional(input.phone)),
        note: Set(optional(input.note)),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

pub async fn delete_company(db: &DatabaseConnection, id: i32) -> Result<(), DomainError> {
    let company = get_company(db, id).await?;
    company.delete(db).await?;
    Ok(())
}

// --- Parks ---

#[derive(Debug, Clone, Deserialize)]
pub struct CreateParkInput {
    pub name: String,
    pub address: Option<String>,
    pub note: Option<String>,
}

pub async fn list_parks(db: &DatabaseConnection) -> Result<Vec<park::Model>, DomainError> {
    Ok(Park::find().order_by_asc(park::Column::Name).all(db).await?)
}

pub async fn get_park(db: &DatabaseConnection, id: i32) -> Result<park::Model, DomainError> {
    Park::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::not_found("park", id))
}

pub async fn create_park(
    db: &DatabaseConnection,
    input: CreateParkInput,
) -> Result<park::Model, DomainError> {
    let mut errors = FieldErrors::new();
    required("name", &input.name, &mut errors);
    errors.into_result()?;

    let now = Utc::now().to_rfc3339();
    Ok(park::ActiveModel {
        name: Set(input.name.trim().to_string()),
        address: Set(optional(input.address)),
        note: Set(optional(input.note)),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Materials of a deleted park are kept, without a park
pub async fn delete_park(db: &DatabaseConnection, id: i32) -> Result<(), DomainError> {
    let park = get_park(db, id).await?;
    park.delete(db).await?;
    Ok(())
}

// --- Categories ---

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryInput {
    pub name: String,
}

/// A category with its sub-categories
#[derive(Debug, Clone, Serialize)]
pub struct CategoryDetails {
    #[serde(flatten)]
    pub category: category::Model,
    pub sub_categories: Vec<sub_category::Model>,
}

pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<CategoryDetails>, DomainError> {
    let categories = Category::find()
        .order_by_asc(category::Column::Name)
        .order_by_asc(category::Column::Id)
        .find_with_related(SubCategory)
        .all(db)
        .await?;

    Ok(categories
        .into_iter()
        .map(|(category, mut sub_categories)| {
            sub_categories.sort_by(|a, b| a.name.cmp(&b.name));
            CategoryDetails {
                category,
                sub_categories,
            }
        })
        .collect())
}

pub async fn get_category(db: &DatabaseConnection, id: i32) -> Result<CategoryDetails, DomainError> {
    let category = Category::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::not_found("category", id))?;
    let sub_categories = category
        .find_related(SubCategory)
        .order_by_asc(sub_category::Column::Name)
        .all(db)
        .await?;

    Ok(CategoryDetails {
        category,
        sub_categories,
    })
}

pub async fn create_category(
    db: &DatabaseConnection,
    input: CreateCategoryInput,
) -> Result<CategoryDetails, DomainError> {
    let mut errors = FieldErrors::new();
    required("name", &input.name, &mut errors);
    errors.into_result()?;

    let now = Utc::now().to_rfc3339();
    let category = category::ActiveModel {
        name: Set(input.name.trim().to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(CategoryDetails {
        category,
        sub_categories: Vec::new(),
    })
}

/// Sub-categories go with their category
pub async fn delete_category(db: &DatabaseConnection, id: i32) -> Result<(), DomainError> {
    let category = Category::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::not_found("category", id))?;
    category.delete(db).await?;
    Ok(())
}

pub async fn create_sub_category(
    db: &DatabaseConnection,
    category_id: i32,
    input: CreateCategoryInput,
) -> Result<sub_category::Model, DomainError> {
    Category::find_by_id(category_id)
        .one(db)
        .await?
        .ok_or(DomainError::not_found("category", category_id))?;

    let mut errors = FieldErrors::new();
    required("name", &input.name, &mut errors);
    errors.into_result()?;

    let now = Utc::now().to_rfc3339();
    let existing = SubCategory::find()
        .filter(sub_category::Column::CategoryId.eq(category_id))
        .filter(sub_category::Column::Name.eq(input.name.trim()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(DomainError::DuplicateKey {
            field: "name".to_string(),
            message: "This sub-category already exists in the category".to_string(),
        });
    }

    Ok(sub_category::ActiveModel {
        name: Set(input.name.trim().to_string()),
        category_id: Set(category_id),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?)
}
