use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};
use serde::Serialize;

use crate::entities::{profile, support_ticket};
use crate::error::AppResult;

#[derive(Debug, Clone, Serialize)]
pub struct TicketAuthor {
    pub full_name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketWithAuthor {
    #[serde(flatten)]
    pub ticket: support_ticket::Model,
    pub author: Option<TicketAuthor>,
}

pub struct TicketRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> TicketRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_tickets(&self) -> AppResult<Vec<TicketWithAuthor>> {
        let rows = support_ticket::Entity::find()
            .find_also_related(profile::Entity)
            .order_by_desc(support_ticket::Column::CreatedAt)
            .all(self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(ticket, author)| TicketWithAuthor {
                ticket,
                author: author.map(|p| TicketAuthor {
                    full_name: p.full_name,
                    email: p.email,
                }),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{ActiveModelTrait, Set};
    use uuid::Uuid;

    use super::*;
    use crate::data::now;
    use crate::data::test_support::{seed_user, test_db};
    use crate::entities::Role;

    #[tokio::test]
    async fn test_tickets_carry_author() {
        let db = test_db().await;
        let user = seed_user(&db, "Huda", Role::Shipper).await;
        support_ticket::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user),
            subject: Set("Invoice".to_string()),
            message: Set("Missing invoice for last load".to_string()),
            status: Set("open".to_string()),
            priority: Set("high".to_string()),
            assigned_to: Set(None),
            created_at: Set(now()),
            updated_at: Set(now()),
        }
        .insert(&db)
        .await
        .unwrap();

        let tickets = TicketRepository::new(&db).get_tickets().await.unwrap();

        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].author.as_ref().unwrap().full_name, "Huda");
    }
}
