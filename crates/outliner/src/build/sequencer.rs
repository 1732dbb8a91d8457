//! Sequencer mode: top-level strips, with strips that share a media file
//! folded into one duplicate group.

use outliner_core::{DomainId, ElementIndex, RecordKey, TypeTag};

use super::Builder;
use crate::domain::{StripInfo, StripKind};
use crate::tree::NodeId;

/// How a strip shows up at the top level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// On its own.
    Standalone,
    /// Heads a group of every strip sharing its media.
    GroupHead,
    /// Already listed in an earlier group.
    Grouped,
}

fn placement(strips: &[Option<StripInfo>], at: usize) -> Placement {
    let Some(media) = strips[at].as_ref().and_then(StripInfo::media_name) else {
        return Placement::Standalone;
    };
    let same_media = |other: &Option<StripInfo>| {
        other.as_ref().and_then(StripInfo::media_name) == Some(media)
    };
    if strips[..at].iter().any(same_media) {
        Placement::Grouped
    } else if strips[at + 1..].iter().any(same_media) {
        Placement::GroupHead
    } else {
        Placement::Standalone
    }
}

pub(super) fn build(cx: &mut Builder<'_>) {
    let graph = cx.graph;
    let Some(ids) = graph.sequence_strips() else {
        return;
    };
    let infos: Vec<Option<StripInfo>> = ids.iter().map(|&id| graph.strip(id)).collect();

    for (at, &id) in ids.iter().enumerate() {
        let Some(info) = &infos[at] else {
            cx.check_live(id);
            continue;
        };
        match placement(&infos, at) {
            Placement::Standalone => add_strip(cx, None, id, info, 0),
            Placement::GroupHead => {
                let media = info.media_name().unwrap_or_default().to_owned();
                let (group, _) = cx.push(
                    None,
                    RecordKey::new(TypeTag::SequenceDup, 0, Some(id)),
                    media.clone(),
                    None,
                );
                for (member_at, &member) in ids.iter().enumerate().skip(at) {
                    if let Some(member_info) = &infos[member_at]
                        && member_info.media_name() == Some(media.as_str())
                    {
                        add_strip(cx, Some(group), member, member_info, 0);
                    }
                }
            }
            Placement::Grouped => {}
        }
    }
}

fn add_strip(
    cx: &mut Builder<'_>,
    parent: Option<NodeId>,
    id: DomainId,
    info: &StripInfo,
    index: ElementIndex,
) {
    let (node, _) = cx.push(
        parent,
        RecordKey::new(TypeTag::Sequence, index, Some(id)),
        info.name.clone(),
        None,
    );
    match &info.kind {
        StripKind::Effect => {}
        StripKind::Meta(inner) => {
            for &child in inner {
                match cx.graph.strip(child) {
                    Some(child_info) => add_strip(cx, Some(node), child, &child_info, index),
                    None => {
                        cx.check_live(child);
                    }
                }
            }
        }
        StripKind::Media => {
            let name = if info.directory.is_empty() {
                "Strip None".to_owned()
            } else {
                info.directory.clone()
            };
            cx.push(
                Some(node),
                RecordKey::new(TypeTag::SequenceStrip, index, Some(id)),
                name,
                None,
            );
        }
    }
}
