//! Per-record field order for the deep copy.
//!
//! A copy reads borrowed views of the source record's variable-length fields,
//! places them into a [`ScratchArena`] in a fixed order and returns the
//! offset of each placed field. The caller rewrites the record's pointers to
//! `base + offset` (or null when the offset is `None`).
//!
//! | record | field order                                  |
//! |--------|----------------------------------------------|
//! | user   | name, passwd, dir, shell (gecos never copied) |
//! | group  | name, passwd, members                        |
//! | host   | name, aliases, addresses (`addr_len` blobs)  |

use crate::arena::ScratchArena;
use crate::error::PackError;
use crate::packer::ElementSize;

/// Variable-length fields of a user record.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserFields<'a> {
    pub name: Option<&'a [u8]>,
    pub passwd: Option<&'a [u8]>,
    pub dir: Option<&'a [u8]>,
    pub shell: Option<&'a [u8]>,
}

/// Offsets of a copied user record's fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserLayout {
    pub name: Option<usize>,
    pub passwd: Option<usize>,
    pub dir: Option<usize>,
    pub shell: Option<usize>,
}

/// Variable-length fields of a group record.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupFields<'a> {
    pub name: Option<&'a [u8]>,
    pub passwd: Option<&'a [u8]>,
    pub members: Option<&'a [&'a [u8]]>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupLayout {
    pub name: Option<usize>,
    pub passwd: Option<usize>,
    /// Offset of the member pointer table.
    pub members: Option<usize>,
}

/// Variable-length fields of a host record.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostFields<'a> {
    pub name: Option<&'a [u8]>,
    pub aliases: Option<&'a [&'a [u8]]>,
    /// Declared length of every address blob.
    pub addr_len: usize,
    pub addresses: Option<&'a [&'a [u8]]>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostLayout {
    pub name: Option<usize>,
    pub aliases: Option<usize>,
    pub addresses: Option<usize>,
}

pub fn copy_user(
    fields: &UserFields<'_>,
    arena: &mut ScratchArena<'_>,
) -> Result<UserLayout, PackError> {
    Ok(UserLayout {
        name: arena.place_string(fields.name)?,
        passwd: arena.place_string(fields.passwd)?,
        dir: arena.place_string(fields.dir)?,
        shell: arena.place_string(fields.shell)?,
    })
}

pub fn copy_group(
    fields: &GroupFields<'_>,
    arena: &mut ScratchArena<'_>,
) -> Result<GroupLayout, PackError> {
    Ok(GroupLayout {
        name: arena.place_string(fields.name)?,
        passwd: arena.place_string(fields.passwd)?,
        members: arena.place_array(fields.members, ElementSize::Variable)?,
    })
}

pub fn copy_host(
    fields: &HostFields<'_>,
    arena: &mut ScratchArena<'_>,
) -> Result<HostLayout, PackError> {
    Ok(HostLayout {
        name: arena.place_string(fields.name)?,
        aliases: arena.place_array(fields.aliases, ElementSize::Variable)?,
        addresses: arena.place_array(fields.addresses, ElementSize::Fixed(fields.addr_len))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::FlatView;

    const BASE: usize = 0x5555_0000;

    #[test]
    fn user_round_trips_in_field_order() {
        let mut region = vec![0u8; 256];
        let fields = UserFields {
            name: Some(b"root"),
            passwd: Some(b"x"),
            dir: Some(b"/root"),
            shell: Some(b"/bin/bash"),
        };
        let layout = copy_user(&fields, &mut ScratchArena::new(&mut region, BASE)).unwrap();
        assert_eq!(
            layout,
            UserLayout {
                name: Some(0),
                passwd: Some(5),
                dir: Some(7),
                shell: Some(13),
            }
        );
        let view = FlatView::new(&region, BASE);
        assert_eq!(view.string_at(13), Some(&b"/bin/bash"[..]));
    }

    #[test]
    fn absent_user_fields_stay_absent() {
        let mut region = vec![0u8; 64];
        let fields = UserFields {
            name: Some(b"nobody"),
            ..UserFields::default()
        };
        let layout = copy_user(&fields, &mut ScratchArena::new(&mut region, BASE)).unwrap();
        assert_eq!(layout.name, Some(0));
        assert_eq!(layout.passwd, None);
        assert_eq!(layout.shell, None);
    }

    #[test]
    fn user_that_does_not_fit_is_a_capacity_error() {
        let mut region = vec![0u8; 16];
        let fields = UserFields {
            name: Some(b"averyveryverylongloginname"),
            ..UserFields::default()
        };
        let err = copy_user(&fields, &mut ScratchArena::new(&mut region, BASE)).unwrap_err();
        assert!(err.is_capacity());
    }

    #[test]
    fn group_members_round_trip() {
        let mut region = vec![0u8; 256];
        let members: [&[u8]; 3] = [b"root", b"alice", b"bob"];
        let fields = GroupFields {
            name: Some(b"wheel"),
            passwd: Some(b"x"),
            members: Some(&members),
        };
        let layout = copy_group(&fields, &mut ScratchArena::new(&mut region, BASE)).unwrap();
        let view = FlatView::new(&region, BASE);
        assert_eq!(view.string_at(layout.name.unwrap()), Some(&b"wheel"[..]));
        assert_eq!(
            view.array_at(layout.members.unwrap(), ElementSize::Variable)
                .unwrap(),
            members.to_vec()
        );
    }

    #[test]
    fn group_with_no_members_has_null_only_table() {
        let mut region = vec![0u8; 64];
        let fields = GroupFields {
            name: Some(b"empty"),
            passwd: Some(b""),
            members: Some(&[]),
        };
        let layout = copy_group(&fields, &mut ScratchArena::new(&mut region, BASE)).unwrap();
        let view = FlatView::new(&region, BASE);
        assert_eq!(
            view.array_at(layout.members.unwrap(), ElementSize::Variable),
            Some(Vec::new())
        );
    }

    #[test]
    fn host_with_two_addresses_has_two_blobs_then_null() {
        let mut region = vec![0u8; 256];
        let aliases: [&[u8]; 1] = [b"db"];
        let addresses: [&[u8]; 2] = [&[10, 0, 0, 1], &[10, 0, 0, 2]];
        let fields = HostFields {
            name: Some(b"db.internal"),
            aliases: Some(&aliases),
            addr_len: 4,
            addresses: Some(&addresses),
        };
        let layout = copy_host(&fields, &mut ScratchArena::new(&mut region, BASE)).unwrap();
        let view = FlatView::new(&region, BASE);
        let table = layout.addresses.unwrap();
        assert_eq!(
            view.array_at(table, ElementSize::Fixed(4)).unwrap(),
            addresses.to_vec()
        );
        let null_slot = crate::packer::read_slot(&region[table..], 2);
        assert_eq!(null_slot, Some(0));
    }

    #[test]
    fn host_address_shorter_than_declared_is_rejected() {
        let mut region = vec![0u8; 256];
        let addresses: [&[u8]; 1] = [&[10, 0]];
        let fields = HostFields {
            name: Some(b"short"),
            aliases: None,
            addr_len: 4,
            addresses: Some(&addresses),
        };
        let err = copy_host(&fields, &mut ScratchArena::new(&mut region, BASE)).unwrap_err();
        assert!(!err.is_capacity());
    }

    #[test]
    fn host_overflow_in_last_field_is_a_capacity_error() {
        let mut region = vec![0u8; 48];
        let addresses: [&[u8]; 4] = [&[0; 16], &[1; 16], &[2; 16], &[3; 16]];
        let fields = HostFields {
            name: Some(b"h"),
            aliases: Some(&[]),
            addr_len: 16,
            addresses: Some(&addresses),
        };
        let err = copy_host(&fields, &mut ScratchArena::new(&mut region, BASE)).unwrap_err();
        assert!(err.is_capacity());
    }
}
