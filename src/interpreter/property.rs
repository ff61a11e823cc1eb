use crate::types::JsValue;
use bitflags::bitflags;

bitflags! {
    /// Attribute bits of a property descriptor. Each attribute has a value
    /// bit and a "set" bit recording whether the descriptor specifies it.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PropertyFlag: u8 {
        const ENUMERABLE = 1 << 0;
        const ENUMERABLE_SET = 1 << 1;
        const WRITABLE = 1 << 2;
        const WRITABLE_SET = 1 << 3;
        const CONFIGURABLE = 1 << 4;
        const CONFIGURABLE_SET = 1 << 5;

        const ALL_FORBIDDEN = Self::ENUMERABLE_SET.bits()
            | Self::WRITABLE_SET.bits()
            | Self::CONFIGURABLE_SET.bits();
        const CONFIGURABLE_ENUMERABLE_WRITABLE = Self::ALL_FORBIDDEN.bits()
            | Self::ENUMERABLE.bits()
            | Self::WRITABLE.bits()
            | Self::CONFIGURABLE.bits();
        const NON_CONFIGURABLE = Self::ALL_FORBIDDEN.bits()
            | Self::ENUMERABLE.bits()
            | Self::WRITABLE.bits();
        const NON_ENUMERABLE = Self::ALL_FORBIDDEN.bits()
            | Self::WRITABLE.bits()
            | Self::CONFIGURABLE.bits();
        const ONLY_ENUMERABLE = Self::ALL_FORBIDDEN.bits() | Self::ENUMERABLE.bits();
        const ONLY_WRITABLE = Self::ALL_FORBIDDEN.bits() | Self::WRITABLE.bits();
        const ONLY_CONFIGURABLE = Self::ALL_FORBIDDEN.bits() | Self::CONFIGURABLE.bits();
    }
}

impl PropertyFlag {
    pub fn from_attributes(writable: bool, enumerable: bool, configurable: bool) -> Self {
        let mut flags = PropertyFlag::ALL_FORBIDDEN;
        flags.set(PropertyFlag::WRITABLE, writable);
        flags.set(PropertyFlag::ENUMERABLE, enumerable);
        flags.set(PropertyFlag::CONFIGURABLE, configurable);
        flags
    }
}

/// A property descriptor (§8.10). Data fields (`value`, writable) and accessor
/// fields (`get`, `set`) are never both present.
#[derive(Clone, Debug)]
pub struct PropertyDescriptor {
    flags: PropertyFlag,
    value: Option<JsValue>,
    get: Option<JsValue>,
    set: Option<JsValue>,
}

impl PropertyDescriptor {
    pub fn new(value: JsValue, flags: PropertyFlag) -> Self {
        Self {
            flags: flags | PropertyFlag::WRITABLE_SET,
            value: Some(value),
            get: None,
            set: None,
        }
    }

    pub fn data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self::new(
            value,
            PropertyFlag::from_attributes(writable, enumerable, configurable),
        )
    }

    /// Property created by a plain assignment: writable, enumerable, configurable.
    pub fn data_default(value: JsValue) -> Self {
        Self::new(value, PropertyFlag::CONFIGURABLE_ENUMERABLE_WRITABLE)
    }

    pub fn accessor(
        get: Option<JsValue>,
        set: Option<JsValue>,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        let mut flags = PropertyFlag::ENUMERABLE_SET | PropertyFlag::CONFIGURABLE_SET;
        flags.set(PropertyFlag::ENUMERABLE, enumerable);
        flags.set(PropertyFlag::CONFIGURABLE, configurable);
        Self {
            flags,
            value: None,
            get: Some(get.unwrap_or_default()),
            set: Some(set.unwrap_or_default()),
        }
    }

    /// Descriptor with no fields; the result of ToPropertyDescriptor(`{}`).
    pub fn generic() -> Self {
        Self {
            flags: PropertyFlag::empty(),
            value: None,
            get: None,
            set: None,
        }
    }

    /// Builds a partial descriptor as produced by ToPropertyDescriptor.
    /// Fails when data and accessor fields are mixed.
    pub fn partial(
        value: Option<JsValue>,
        writable: Option<bool>,
        get: Option<JsValue>,
        set: Option<JsValue>,
        enumerable: Option<bool>,
        configurable: Option<bool>,
    ) -> Result<Self, &'static str> {
        if (get.is_some() || set.is_some()) && (value.is_some() || writable.is_some()) {
            return Err("Invalid property descriptor. Cannot both specify accessors and a value or writable attribute");
        }
        let mut flags = PropertyFlag::empty();
        if let Some(w) = writable {
            flags |= PropertyFlag::WRITABLE_SET;
            flags.set(PropertyFlag::WRITABLE, w);
        }
        if let Some(e) = enumerable {
            flags |= PropertyFlag::ENUMERABLE_SET;
            flags.set(PropertyFlag::ENUMERABLE, e);
        }
        if let Some(c) = configurable {
            flags |= PropertyFlag::CONFIGURABLE_SET;
            flags.set(PropertyFlag::CONFIGURABLE, c);
        }
        Ok(Self {
            flags,
            value,
            get,
            set,
        })
    }

    pub fn flags(&self) -> PropertyFlag {
        self.flags
    }

    pub fn value(&self) -> Option<&JsValue> {
        self.value.as_ref()
    }

    pub fn get(&self) -> Option<&JsValue> {
        self.get.as_ref()
    }

    pub fn set(&self) -> Option<&JsValue> {
        self.set.as_ref()
    }

    pub fn enumerable(&self) -> bool {
        self.flags.contains(PropertyFlag::ENUMERABLE)
    }

    pub fn writable(&self) -> bool {
        self.flags.contains(PropertyFlag::WRITABLE)
    }

    pub fn configurable(&self) -> bool {
        self.flags.contains(PropertyFlag::CONFIGURABLE)
    }

    pub fn enumerable_set(&self) -> bool {
        self.flags.contains(PropertyFlag::ENUMERABLE_SET)
    }

    pub fn writable_set(&self) -> bool {
        self.flags.contains(PropertyFlag::WRITABLE_SET)
    }

    pub fn configurable_set(&self) -> bool {
        self.flags.contains(PropertyFlag::CONFIGURABLE_SET)
    }

    // §8.10.1
    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    // §8.10.2
    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable_set()
    }

    // §8.10.3
    pub fn is_generic_descriptor(&self) -> bool {
        !self.is_accessor_descriptor() && !self.is_data_descriptor()
    }

    /// True when every field is absent (§8.12.9 step 5).
    pub fn is_empty(&self) -> bool {
        self.is_generic_descriptor() && !self.enumerable_set() && !self.configurable_set()
    }

    pub(crate) fn set_value(&mut self, value: JsValue) {
        debug_assert!(!self.is_accessor_descriptor());
        self.value = Some(value);
    }

    pub(crate) fn value_or_undefined(&self) -> JsValue {
        self.value.clone().unwrap_or_default()
    }

    /// Overlays every field present in `update` onto this descriptor, which
    /// becomes a complete descriptor of the kind `update` describes.
    pub(crate) fn merge(&mut self, update: &PropertyDescriptor) {
        if update.enumerable_set() {
            self.flags.set(PropertyFlag::ENUMERABLE, update.enumerable());
        }
        if update.configurable_set() {
            self.flags.set(PropertyFlag::CONFIGURABLE, update.configurable());
        }
        if update.writable_set() {
            self.flags.set(PropertyFlag::WRITABLE, update.writable());
        }
        if let Some(v) = &update.value {
            self.value = Some(v.clone());
        }
        if let Some(g) = &update.get {
            self.get = Some(g.clone());
        }
        if let Some(s) = &update.set {
            self.set = Some(s.clone());
        }
    }

    /// Converts a data descriptor to an accessor one keeping the
    /// configurable and enumerable attributes (§8.12.9 step 9.b).
    pub(crate) fn into_accessor(self) -> Self {
        let mut flags = self.flags & (PropertyFlag::ENUMERABLE | PropertyFlag::CONFIGURABLE);
        flags |= PropertyFlag::ENUMERABLE_SET | PropertyFlag::CONFIGURABLE_SET;
        Self {
            flags,
            value: None,
            get: Some(JsValue::Undefined),
            set: Some(JsValue::Undefined),
        }
    }

    /// Converts an accessor descriptor to a data one (§8.12.9 step 9.c).
    pub(crate) fn into_data(self) -> Self {
        let mut flags = self.flags & (PropertyFlag::ENUMERABLE | PropertyFlag::CONFIGURABLE);
        flags |= PropertyFlag::ALL_FORBIDDEN;
        Self {
            flags,
            value: Some(JsValue::Undefined),
            get: None,
            set: None,
        }
    }

    /// Fills absent fields with their defaults so the descriptor can be stored.
    pub(crate) fn complete(mut self) -> Self {
        if self.is_accessor_descriptor() {
            self.get.get_or_insert(JsValue::Undefined);
            self.set.get_or_insert(JsValue::Undefined);
        } else {
            self.value.get_or_insert(JsValue::Undefined);
            self.flags |= PropertyFlag::WRITABLE_SET;
        }
        self.flags |= PropertyFlag::ENUMERABLE_SET | PropertyFlag::CONFIGURABLE_SET;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_flag_combinations() {
        let d = PropertyDescriptor::new(JsValue::Undefined, PropertyFlag::ALL_FORBIDDEN);
        assert!(!d.writable() && !d.enumerable() && !d.configurable());
        assert!(d.writable_set() && d.enumerable_set() && d.configurable_set());

        let d = PropertyDescriptor::data_default(JsValue::Null);
        assert!(d.writable() && d.enumerable() && d.configurable());

        let d = PropertyDescriptor::new(JsValue::Null, PropertyFlag::NON_ENUMERABLE);
        assert!(d.writable() && !d.enumerable() && d.configurable());

        let d = PropertyDescriptor::new(JsValue::Null, PropertyFlag::ONLY_WRITABLE);
        assert!(d.writable() && !d.enumerable() && !d.configurable());
    }

    #[test]
    fn descriptor_kinds() {
        let data = PropertyDescriptor::data(JsValue::Number(1.0), true, true, true);
        assert!(data.is_data_descriptor());
        assert!(!data.is_accessor_descriptor());

        let acc = PropertyDescriptor::accessor(None, None, false, true);
        assert!(acc.is_accessor_descriptor());
        assert!(!acc.is_data_descriptor());

        assert!(PropertyDescriptor::generic().is_generic_descriptor());
        assert!(PropertyDescriptor::generic().is_empty());
    }

    #[test]
    fn partial_rejects_mixed_fields() {
        let mixed = PropertyDescriptor::partial(
            Some(JsValue::Number(1.0)),
            None,
            Some(JsValue::Undefined),
            None,
            None,
            None,
        );
        assert!(mixed.is_err());

        let ok = PropertyDescriptor::partial(None, Some(false), None, None, Some(true), None)
            .unwrap_or_else(|_| PropertyDescriptor::generic());
        assert!(ok.is_data_descriptor());
        assert!(ok.enumerable_set() && ok.enumerable());
        assert!(!ok.configurable_set());
    }

    #[test]
    fn conversion_keeps_shared_attributes() {
        let data = PropertyDescriptor::data(JsValue::Number(1.0), true, true, true);
        let acc = data.into_accessor();
        assert!(acc.is_accessor_descriptor());
        assert!(acc.enumerable() && acc.configurable());
        let back = acc.into_data();
        assert!(back.is_data_descriptor());
        assert!(!back.writable());
        assert!(back.value().is_some_and(|v| v.is_undefined()));
    }
}
