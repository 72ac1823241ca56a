//! Tests for commit submission, confirmation and lock toggling.

use bfc_model::{DestinationId, LevelId, SourceId, SourceLevel};
use pretty_assertions::assert_eq;

use super::helpers::{STUDIO, TestView, key};
use crate::driver::Notice;
use crate::pending::PendingChange;
use crate::projection::CellOverlay;
use crate::submit::CellSelection;
use crate::transport::TransportError;

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn confirmed_take_clears_the_queued_overlay() {
	let mut t = TestView::studio();
	t.next_display().await;

	let change = t.view.edit(DestinationId(5), LevelId(2), "SourceX.L2").await.unwrap();
	assert_eq!(change, Some(PendingChange::new(DestinationId(5), LevelId(2), SourceId(20), LevelId(2))));

	let queued = t.next_display().await;
	let cell = queued.cell(key(5, 2)).unwrap();
	assert_eq!(cell.text, "SourceX.L2");
	assert_eq!(cell.overlay, CellOverlay::Queued);

	assert_eq!(t.view.take().await.unwrap(), 1);
	let settled = t.next_display().await;
	let cell = settled.cell(key(5, 2)).unwrap();
	assert_eq!(cell.text, "SourceX.L2");
	assert_eq!(cell.overlay, CellOverlay::Normal);
	assert!(t.view.pending().await.unwrap().is_empty());
	assert_eq!(
		t.backend.crosspoint(STUDIO, key(5, 2)).map(|xpt| xpt.value()),
		Some(SourceLevel::new(SourceId(20), LevelId(2)))
	);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn commit_on_locked_cell_stays_pending() {
	let mut t = TestView::studio();
	t.next_display().await;

	t.view.edit(DestinationId(6), LevelId(1), "SourceX.L1").await.unwrap();
	let queued = t.next_display().await;
	assert_eq!(queued.cell(key(6, 1)).unwrap().overlay, CellOverlay::QueuedAndLocked);

	assert_eq!(t.view.take().await.unwrap(), 1);
	assert_eq!(
		t.next_notice().await,
		Notice::CommitFailed {
			key: key(6, 1),
			error: TransportError::Locked {
				destination: DestinationId(6),
				level: LevelId(1),
			},
		}
	);
	assert_eq!(t.view.pending().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn failed_take_can_be_retried() {
	let mut t = TestView::studio();
	t.next_display().await;
	t.backend.set_fail_commits(true);

	t.view.edit(DestinationId(5), LevelId(1), "SourceX.L1").await.unwrap();
	assert_eq!(t.view.take().await.unwrap(), 1);
	assert!(matches!(t.next_notice().await, Notice::CommitFailed { .. }));
	assert_eq!(t.view.pending().await.unwrap().len(), 1);

	t.backend.set_fail_commits(false);
	assert_eq!(t.view.take().await.unwrap(), 1);
	loop {
		let matrix = t.next_display().await;
		if matrix.cell(key(5, 1)).unwrap().overlay == CellOverlay::Normal {
			assert_eq!(matrix.cell(key(5, 1)).unwrap().text, "SourceX.L1");
			break;
		}
	}
	assert!(t.view.pending().await.unwrap().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn take_with_nothing_pending_issues_no_requests() {
	let mut t = TestView::studio();
	t.next_display().await;
	assert_eq!(t.view.take().await.unwrap(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn lock_range_inverts_each_selected_cell() {
	let mut t = TestView::studio();
	t.next_display().await;

	let issued = t.view.toggle_lock_range(CellSelection::new(0, 1, LevelId(1), LevelId(1))).await.unwrap();
	assert_eq!(issued, 2);

	let matrix = t.next_display().await;
	assert_eq!(matrix.cell(key(5, 1)).unwrap().overlay, CellOverlay::Locked);
	assert_eq!(matrix.cell(key(6, 1)).unwrap().overlay, CellOverlay::Normal);
	assert_eq!(t.backend.crosspoint(STUDIO, key(6, 1)).map(|xpt| xpt.locked), Some(false));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn lock_range_addresses_filtered_rows() {
	let mut t = TestView::studio();
	t.next_display().await;
	t.view.set_filter("REC").unwrap();
	assert_eq!(t.next_display().await.destinations(), vec![DestinationId(7)]);

	let issued = t.view.toggle_lock_range(CellSelection::new(0, 0, LevelId(1), LevelId(2))).await.unwrap();
	assert_eq!(issued, 1);

	let matrix = t.next_display().await;
	assert_eq!(matrix.cell(key(7, 1)).unwrap().overlay, CellOverlay::Locked);
}
