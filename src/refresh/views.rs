//! Controllers backing each live screen.

use sea_orm::DatabaseConnection;
use serde::Serialize;
use uuid::Uuid;

use super::RefreshController;
use crate::data::loads::LoadWithOwner;
use crate::data::profiles::UserWithRole;
use crate::data::{
    AdminStats, FleetRepository, LoadRepository, NotificationRepository, ProfileRepository,
    StatsRepository,
};
use crate::entities::{driver_details, load, notification, sub_driver, truck};
use crate::error::AppResult;
use crate::realtime::{ChangeHub, Table};

#[derive(Debug, Clone, Serialize)]
pub struct FleetSnapshot {
    pub trucks: Vec<truck::Model>,
    pub sub_drivers: Vec<sub_driver::Model>,
    pub details: Option<driver_details::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub stats: AdminStats,
    pub users: Vec<UserWithRole>,
}

/// Open loads a driver can take, keyed by the viewing driver so their own
/// postings stay off the board.
pub fn available_loads(
    db: &DatabaseConnection,
    changes: &ChangeHub,
) -> RefreshController<Uuid, Vec<LoadWithOwner>> {
    let (db, hub) = (db.clone(), changes.clone());
    RefreshController::new(changes, [Table::Loads], move |viewer| {
        fetch_board(db.clone(), hub.clone(), viewer)
    })
}

async fn fetch_board(
    db: DatabaseConnection,
    hub: ChangeHub,
    viewer: Uuid,
) -> AppResult<Vec<LoadWithOwner>> {
    let loads = LoadRepository::new(&db, &hub).get_available_loads().await?;
    Ok(loads
        .into_iter()
        .filter(|l| l.load.owner_id != viewer)
        .collect())
}

/// Loads a user posted or is carrying.
pub fn user_loads(
    db: &DatabaseConnection,
    changes: &ChangeHub,
) -> RefreshController<Uuid, Vec<load::Model>> {
    let (db, hub) = (db.clone(), changes.clone());
    RefreshController::new(changes, [Table::Loads], move |user_id| {
        let (db, hub) = (db.clone(), hub.clone());
        async move { LoadRepository::new(&db, &hub).get_user_loads(user_id).await }
    })
}

pub fn fleet(db: &DatabaseConnection, changes: &ChangeHub) -> RefreshController<Uuid, FleetSnapshot> {
    let (db, hub) = (db.clone(), changes.clone());
    RefreshController::new(
        changes,
        [Table::Trucks, Table::SubDrivers, Table::DriverDetails],
        move |carrier_id| fetch_fleet(db.clone(), hub.clone(), carrier_id),
    )
}

async fn fetch_fleet(
    db: DatabaseConnection,
    hub: ChangeHub,
    carrier_id: Uuid,
) -> AppResult<FleetSnapshot> {
    let fleet = FleetRepository::new(&db, &hub);
    Ok(FleetSnapshot {
        trucks: fleet.get_trucks(carrier_id).await?,
        sub_drivers: fleet.get_sub_drivers(carrier_id).await?,
        details: fleet.get_driver_details(carrier_id).await?,
    })
}

pub fn notifications(
    db: &DatabaseConnection,
    changes: &ChangeHub,
) -> RefreshController<Uuid, Vec<notification::Model>> {
    let (db, hub) = (db.clone(), changes.clone());
    RefreshController::new(changes, [Table::Notifications], move |user_id| {
        let (db, hub) = (db.clone(), hub.clone());
        async move {
            NotificationRepository::new(&db, &hub)
                .get_notifications(user_id)
                .await
        }
    })
}

pub fn admin_dashboard(
    db: &DatabaseConnection,
    changes: &ChangeHub,
) -> RefreshController<(), AdminDashboard> {
    let (db, hub) = (db.clone(), changes.clone());
    RefreshController::new(
        changes,
        [Table::Profiles, Table::UserRoles, Table::Loads],
        move |()| fetch_dashboard(db.clone(), hub.clone()),
    )
}

async fn fetch_dashboard(db: DatabaseConnection, hub: ChangeHub) -> AppResult<AdminDashboard> {
    Ok(AdminDashboard {
        stats: StatsRepository::new(&db).get_admin_stats().await?,
        users: ProfileRepository::new(&db, &hub).get_all_users().await?,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::watch;

    use super::*;
    use crate::data::test_support::{seed_user, test_db};
    use crate::data::{NewTruck, PostLoad};
    use crate::entities::Role;
    use crate::refresh::{Phase, ViewState};

    async fn settle<T: Clone>(
        states: &mut watch::Receiver<ViewState<T>>,
        done: impl FnMut(&ViewState<T>) -> bool,
    ) -> ViewState<T> {
        tokio::time::timeout(Duration::from_secs(2), states.wait_for(done))
            .await
            .expect("view did not settle")
            .unwrap()
            .clone()
    }

    fn load(origin: &str) -> PostLoad {
        PostLoad {
            origin: origin.to_string(),
            destination: "Jeddah".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_board_tracks_posts_and_acceptance() {
        let db = test_db().await;
        let changes = ChangeHub::new(64);
        let shipper = seed_user(&db, "Shipper", Role::Shipper).await;
        let driver = seed_user(&db, "Driver", Role::Driver).await;
        let board = available_loads(&db, &changes);
        let mut states = board.watch();
        board.initialize(Some(driver));
        settle(&mut states, |s| s.phase == Phase::Ready).await;

        let loads = LoadRepository::new(&db, &changes);
        let posted = loads.post_load(load("Riyadh"), shipper).await.unwrap();
        let state = settle(&mut states, |s| {
            s.data.as_ref().is_some_and(|d| d.len() == 1)
        })
        .await;
        assert_eq!(state.data.unwrap()[0].load.id, posted.id);

        loads.accept_load(posted.id, driver).await.unwrap();
        settle(&mut states, |s| {
            s.phase == Phase::Ready && s.data.as_ref().is_some_and(|d| d.is_empty())
        })
        .await;
    }

    #[tokio::test]
    async fn test_board_hides_viewers_own_loads() {
        let db = test_db().await;
        let changes = ChangeHub::new(64);
        let both = seed_user(&db, "Owner Operator", Role::Driver).await;
        let shipper = seed_user(&db, "Shipper", Role::Shipper).await;
        let loads = LoadRepository::new(&db, &changes);
        loads.post_load(load("Riyadh"), both).await.unwrap();
        let foreign = loads.post_load(load("Dammam"), shipper).await.unwrap();

        let board = available_loads(&db, &changes);
        let mut states = board.watch();
        board.initialize(Some(both));

        let state = settle(&mut states, |s| s.phase == Phase::Ready).await;
        let data = state.data.unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].load.id, foreign.id);
    }

    #[tokio::test]
    async fn test_fleet_view_follows_truck_changes() {
        let db = test_db().await;
        let changes = ChangeHub::new(64);
        let carrier = seed_user(&db, "Carrier", Role::Driver).await;
        let view = fleet(&db, &changes);
        let mut states = view.watch();
        view.initialize(Some(carrier));
        settle(&mut states, |s| s.phase == Phase::Ready).await;

        FleetRepository::new(&db, &changes)
            .add_truck(
                NewTruck {
                    plate_number: "XYZ 987".to_string(),
                    ..Default::default()
                },
                carrier,
            )
            .await
            .unwrap();

        let state = settle(&mut states, |s| {
            s.data.as_ref().is_some_and(|f| f.trucks.len() == 1)
        })
        .await;
        assert!(state.data.unwrap().sub_drivers.is_empty());
    }

    #[tokio::test]
    async fn test_notifications_view_rekeys_per_user() {
        let db = test_db().await;
        let changes = ChangeHub::new(64);
        let first = seed_user(&db, "First", Role::Shipper).await;
        let second = seed_user(&db, "Second", Role::Driver).await;
        let inbox = NotificationRepository::new(&db, &changes);
        inbox.send_notification(first, "Hello", "first").await.unwrap();

        let view = notifications(&db, &changes);
        let mut states = view.watch();
        let (session, subjects) = watch::channel(Some(first));
        view.follow(subjects);
        let state = settle(&mut states, |s| s.phase == Phase::Ready).await;
        assert_eq!(state.data.unwrap().len(), 1);

        session.send_replace(Some(second));
        let state = settle(&mut states, |s| {
            s.phase == Phase::Ready && s.data.as_ref().is_some_and(|d| d.is_empty())
        })
        .await;
        assert!(state.epoch > 1);
    }

    #[tokio::test]
    async fn test_admin_dashboard_counts_new_users() {
        let db = test_db().await;
        let changes = ChangeHub::new(64);
        let view = admin_dashboard(&db, &changes);
        let mut states = view.watch();
        view.initialize(Some(()));
        let state = settle(&mut states, |s| s.phase == Phase::Ready).await;
        assert_eq!(state.data.unwrap().stats.total_users, 0);

        let user = seed_user(&db, "Late Joiner", Role::Driver).await;
        changes.inserted(Table::Profiles, user);

        let state = settle(&mut states, |s| {
            s.data.as_ref().is_some_and(|d| d.stats.total_users == 1)
        })
        .await;
        assert_eq!(state.data.unwrap().stats.total_drivers, 1);
    }
}
